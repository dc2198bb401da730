use std::collections::HashSet;

use chatdrive_core::Folder;

/// Union of `local` and `remote` keyed by id. Local entries keep their
/// position and values; unseen remote folders are appended in order.
/// Returns the merged list and how many folders were added.
pub fn merge_folders(local: &[Folder], remote: &[Folder]) -> (Vec<Folder>, usize) {
    let mut known: HashSet<i64> = local.iter().map(|folder| folder.id).collect();
    let mut merged = local.to_vec();
    for folder in remote {
        if known.insert(folder.id) {
            merged.push(folder.clone());
        }
    }
    let added = merged.len() - local.len();
    (merged, added)
}

pub fn without_folder(folders: &[Folder], id: i64) -> Vec<Folder> {
    folders
        .iter()
        .filter(|folder| folder.id != id)
        .cloned()
        .collect()
}
