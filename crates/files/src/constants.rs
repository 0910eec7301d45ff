/// Prefix of the staging file a copy is written to before it is published under its final name.
pub const PARTIAL_FILE_PREFIX: &str = ".megsync-partial-";

/// Size of the buffer used when streaming a recording into the destination tree.
pub const COPY_BUFFER_BYTES: usize = 1024 * 1024;
