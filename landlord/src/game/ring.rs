//! Turn order over a table's occupants.

use super::entities::PlayerId;

/// Seating order as an ordered list of occupant ids with an optional
/// cursor marking whose turn it is.
///
/// Following [`TurnRing::advance_from`] from any member visits every
/// member once before returning to the start.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TurnRing {
    order: Vec<PlayerId>,
    cursor: Option<usize>,
}

impl TurnRing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.position(id).is_some()
    }

    pub fn members(&self) -> &[PlayerId] {
        &self.order
    }

    fn position(&self, id: PlayerId) -> Option<usize> {
        self.order.iter().position(|&p| p == id)
    }

    /// Links `id` in as the predecessor of the first member, i.e. at the
    /// end of the seating order. Linking a member twice is a no-op.
    pub fn link(&mut self, id: PlayerId) {
        if !self.contains(id) {
            self.order.push(id);
        }
    }

    /// Whose turn it is, if a turn has been assigned.
    pub fn current(&self) -> Option<PlayerId> {
        self.cursor.map(|i| self.order[i])
    }

    /// Points the cursor at `id`. Returns false if `id` is not a member.
    pub fn set_current(&mut self, id: PlayerId) -> bool {
        match self.position(id) {
            Some(i) => {
                self.cursor = Some(i);
                true
            }
            None => false,
        }
    }

    pub fn clear_current(&mut self) {
        self.cursor = None;
    }

    /// The member seated after `id`.
    pub fn successor(&self, id: PlayerId) -> Option<PlayerId> {
        let i = self.position(id)?;
        Some(self.order[(i + 1) % self.order.len()])
    }

    /// Moves the cursor to the successor of `id` and returns it.
    pub fn advance_from(&mut self, id: PlayerId) -> Option<PlayerId> {
        let i = self.position(id)?;
        let next = (i + 1) % self.order.len();
        self.cursor = Some(next);
        Some(self.order[next])
    }

    /// Removes `id` and returns its successor among the remaining members.
    ///
    /// If `id` held the turn, the turn moves to that successor. The cursor
    /// keeps pointing at the same member otherwise. Returns `None` when
    /// `id` was not a member or was the last one.
    pub fn unlink(&mut self, id: PlayerId) -> Option<PlayerId> {
        let i = self.position(id)?;
        self.order.remove(i);
        if self.order.is_empty() {
            self.cursor = None;
            return None;
        }
        let successor_index = i % self.order.len();
        self.cursor = self.cursor.map(|c| match c.cmp(&i) {
            std::cmp::Ordering::Less => c,
            std::cmp::Ordering::Equal => successor_index,
            std::cmp::Ordering::Greater => c - 1,
        });
        Some(self.order[successor_index])
    }

    /// Walks the ring once starting at `id`.
    pub fn cycle_from(&self, id: PlayerId) -> impl Iterator<Item = PlayerId> + '_ {
        let len = self.order.len();
        self.position(id)
            .into_iter()
            .flat_map(move |start| (0..len).map(move |k| self.order[(start + k) % len]))
    }
}
