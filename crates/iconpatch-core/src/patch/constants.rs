/// Top-level header key holding the patch record; the client ignores it
pub const RECORD_KEY: &str = "iconpatch";
/// Appended to the archive file name to form the backup directory
pub const BACKUP_DIR_SUFFIX: &str = ".iconpatch-backup";
/// Version written into new patch records
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");
