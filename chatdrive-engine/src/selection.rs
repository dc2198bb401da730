use chatdrive_core::FolderId;

/// Remote ids selected in one folder, kept in the order they were picked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    folder: FolderId,
    ids: Vec<i64>,
}

impl SelectionSet {
    pub fn new(folder: FolderId) -> Self {
        Self {
            folder,
            ids: Vec::new(),
        }
    }

    pub fn folder(&self) -> FolderId {
        self.folder
    }

    /// Points the selection at `folder`, dropping it when the folder
    /// changed. Returns whether anything was dropped.
    pub fn retarget(&mut self, folder: FolderId) -> bool {
        if self.folder == folder {
            return false;
        }
        self.folder = folder;
        let had_items = !self.ids.is_empty();
        self.ids.clear();
        had_items
    }

    /// Adds or removes `id`; returns whether it is selected afterwards.
    pub fn toggle(&mut self, id: i64) -> bool {
        match self.ids.iter().position(|&existing| existing == id) {
            Some(index) => {
                self.ids.remove(index);
                false
            }
            None => {
                self.ids.push(id);
                true
            }
        }
    }

    /// Plain click: the selection becomes exactly `id`.
    pub fn select_only(&mut self, id: i64) {
        self.ids.clear();
        self.ids.push(id);
    }

    pub fn contains(&self, id: i64) -> bool {
        self.ids.contains(&id)
    }

    pub fn ids(&self) -> &[i64] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }
}
