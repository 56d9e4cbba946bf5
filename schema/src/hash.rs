//! Deterministic code table fingerprints.

use blake3::Hasher;

use crate::table::{CodeTable, CodeTables};

/// Computes a stable fingerprint of one table's contents.
#[must_use]
pub fn table_fingerprint(table: &CodeTable) -> u64 {
    let mut hasher = Hasher::new();
    write_table(&mut hasher, table);
    finish(&hasher)
}

/// Computes a stable fingerprint over both tables.
#[must_use]
pub fn tables_fingerprint(tables: &CodeTables) -> u64 {
    let mut hasher = Hasher::new();
    write_table(&mut hasher, &tables.events);
    write_table(&mut hasher, &tables.operations);
    finish(&hasher)
}

fn write_table(hasher: &mut Hasher, table: &CodeTable) {
    write_u64(hasher, table.len() as u64);
    for (code, name) in table.iter() {
        hasher.update(&code.to_le_bytes());
        write_u64(hasher, name.len() as u64);
        hasher.update(name.as_bytes());
    }
}

fn write_u64(hasher: &mut Hasher, value: u64) {
    hasher.update(&value.to_le_bytes());
}

fn finish(hasher: &Hasher) -> u64 {
    let hash = hasher.finalize();
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(prefix)
}
