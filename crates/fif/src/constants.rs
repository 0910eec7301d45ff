//! FIF tag kinds and chain markers used by the header reader.

/// File identification block; always the first tag of a FIF file.
pub const FIFF_FILE_ID: i32 = 100;

/// Measurement date: two `i32` values, seconds and microseconds since the Unix epoch (UTC).
pub const FIFF_MEAS_DATE: i32 = 204;

/// Subject hospital identifier (string).
pub const FIFF_SUBJ_HIS_ID: i32 = 410;

/// Opens a block; the payload is the block kind (`i32`).
pub const FIFF_BLOCK_START: i32 = 104;

/// Closes the innermost open block.
pub const FIFF_BLOCK_END: i32 = 105;

/// Measurement info block. The measurement date is read only from its direct children.
pub const FIFFB_MEAS_INFO: i32 = 101;

/// Subject block, nested inside the measurement info block.
pub const FIFFB_SUBJECT: i32 = 106;

/// `next` value meaning the following tag starts right after this one.
pub const NEXT_SEQ: i32 = 0;

/// `next` value meaning this is the last tag in the chain.
pub const NEXT_NONE: i32 = -1;

/// Size of a tag header in bytes.
pub const TAG_HEADER_BYTES: u64 = 16;

/// Upper bound on tags visited before giving up; guards against cyclic `next` pointers.
pub const MAX_TAGS: usize = 1_000_000;

/// Longest subject identifier payload accepted.
pub const MAX_HIS_ID_BYTES: i32 = 1024;
