use crate::constants::{
    FIFFB_MEAS_INFO, FIFFB_SUBJECT, FIFF_BLOCK_END, FIFF_BLOCK_START, FIFF_FILE_ID,
    FIFF_MEAS_DATE, FIFF_SUBJ_HIS_ID, MAX_HIS_ID_BYTES, MAX_TAGS, NEXT_NONE, NEXT_SEQ,
    TAG_HEADER_BYTES,
};
use crate::FifError;
use megsync_types::VisitDate;
use std::io::{ErrorKind, Read, Seek, SeekFrom};

/// The header fields megsync reads from a recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasurementHeader {
    /// Seconds since the Unix epoch (UTC).
    pub meas_secs: i64,
    /// Microsecond part of the measurement timestamp.
    pub meas_usecs: i32,
    /// Subject hospital identifier, when the recording carries one.
    pub subject_his_id: Option<String>,
}

impl MeasurementHeader {
    /// UTC calendar date of the measurement.
    pub fn visit_date(&self) -> Result<VisitDate, FifError> {
        VisitDate::from_unix_seconds(self.meas_secs)
            .map_err(|_| FifError::InvalidTimestamp(self.meas_secs))
    }
}

#[derive(Debug, Clone, Copy)]
struct TagHeader {
    kind: i32,
    size: i32,
    next: i32,
}

/// Walk the tag chain of a FIF stream until the measurement info block has been read.
///
/// The measurement date is taken only from a direct child of the measurement info block, and the
/// subject identifier only from the subject block inside it; other blocks (processing history,
/// for instance) reuse the same tag kinds. The walk stops once the measurement info block closes,
/// so data buffers after it are never visited.
pub fn read_header<R: Read + Seek>(mut reader: R) -> Result<MeasurementHeader, FifError> {
    let mut offset: u64 = 0;
    let mut meas: Option<(i64, i32)> = None;
    let mut his_id: Option<String> = None;
    let mut blocks: Vec<i32> = Vec::new();

    for index in 0..MAX_TAGS {
        reader.seek(SeekFrom::Start(offset))?;
        let Some(tag) = read_tag_header(&mut reader, offset)? else {
            break;
        };

        if index == 0 && tag.kind != FIFF_FILE_ID {
            return Err(FifError::NotFif(tag.kind));
        }
        if tag.size < 0 {
            return Err(FifError::CorruptTag {
                offset,
                reason: format!("negative payload size {}", tag.size),
            });
        }

        let innermost = blocks.last().copied();
        match tag.kind {
            FIFF_BLOCK_START => {
                if tag.size < 4 {
                    return Err(FifError::CorruptTag {
                        offset,
                        reason: format!("block start payload is {} bytes", tag.size),
                    });
                }
                blocks.push(read_i32(&mut reader, offset)?);
            }
            FIFF_BLOCK_END => {
                if blocks.pop() == Some(FIFFB_MEAS_INFO) {
                    break;
                }
            }
            FIFF_MEAS_DATE if meas.is_none() && innermost == Some(FIFFB_MEAS_INFO) => {
                if tag.size < 8 {
                    return Err(FifError::CorruptTag {
                        offset,
                        reason: format!("measurement date payload is {} bytes", tag.size),
                    });
                }
                let secs = read_i32(&mut reader, offset)?;
                let usecs = read_i32(&mut reader, offset)?;
                meas = Some((i64::from(secs), usecs));
            }
            FIFF_SUBJ_HIS_ID
                if his_id.is_none()
                    && innermost == Some(FIFFB_SUBJECT)
                    && blocks.contains(&FIFFB_MEAS_INFO) =>
            {
                if tag.size > MAX_HIS_ID_BYTES {
                    return Err(FifError::CorruptTag {
                        offset,
                        reason: format!("subject id payload is {} bytes", tag.size),
                    });
                }
                let mut buf = vec![0u8; tag.size as usize];
                read_payload(&mut reader, &mut buf, offset)?;
                let text = String::from_utf8_lossy(&buf);
                let text = text.trim_end_matches('\0').trim();
                if !text.is_empty() {
                    his_id = Some(text.to_owned());
                }
            }
            _ => {}
        }

        if meas.is_some() && his_id.is_some() {
            break;
        }

        offset = match tag.next {
            NEXT_SEQ => offset + TAG_HEADER_BYTES + tag.size as u64,
            NEXT_NONE => break,
            n if n > 0 => n as u64,
            n => {
                return Err(FifError::CorruptTag {
                    offset,
                    reason: format!("invalid next pointer {n}"),
                })
            }
        };
    }

    let (meas_secs, meas_usecs) = meas.ok_or(FifError::MissingMeasDate)?;
    Ok(MeasurementHeader {
        meas_secs,
        meas_usecs,
        subject_his_id: his_id,
    })
}

/// Read one tag header; `None` on a clean end of stream.
fn read_tag_header<R: Read>(reader: &mut R, offset: u64) -> Result<Option<TagHeader>, FifError> {
    let mut buf = [0u8; TAG_HEADER_BYTES as usize];
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(FifError::Io(e)),
        }
    }
    if filled == 0 {
        return Ok(None);
    }
    if filled < buf.len() {
        return Err(FifError::Truncated(offset));
    }

    let word = |i: usize| i32::from_be_bytes([buf[i], buf[i + 1], buf[i + 2], buf[i + 3]]);
    Ok(Some(TagHeader {
        kind: word(0),
        size: word(8),
        next: word(12),
    }))
}

fn read_i32<R: Read>(reader: &mut R, offset: u64) -> Result<i32, FifError> {
    let mut buf = [0u8; 4];
    read_payload(reader, &mut buf, offset)?;
    Ok(i32::from_be_bytes(buf))
}

fn read_payload<R: Read>(reader: &mut R, buf: &mut [u8], offset: u64) -> Result<(), FifError> {
    reader.read_exact(buf).map_err(|e| {
        if e.kind() == ErrorKind::UnexpectedEof {
            FifError::CorruptTag {
                offset,
                reason: "payload extends past end of file".into(),
            }
        } else {
            FifError::Io(e)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const FIFFT_INT: i32 = 3;
    const FIFFT_STRING: i32 = 10;
    const FIFFT_ID_STRUCT: i32 = 31;
    const FIFF_DATA_BUFFER: i32 = 300;
    const FIFFB_MEAS: i32 = 100;
    const FIFFB_PROCESSING_HISTORY: i32 = 900;

    fn tag(out: &mut Vec<u8>, kind: i32, ty: i32, payload: &[u8], next: i32) {
        out.extend_from_slice(&kind.to_be_bytes());
        out.extend_from_slice(&ty.to_be_bytes());
        out.extend_from_slice(&(payload.len() as i32).to_be_bytes());
        out.extend_from_slice(&next.to_be_bytes());
        out.extend_from_slice(payload);
    }

    fn meas_date_payload(secs: i32, usecs: i32) -> Vec<u8> {
        let mut p = secs.to_be_bytes().to_vec();
        p.extend_from_slice(&usecs.to_be_bytes());
        p
    }

    fn block_start(out: &mut Vec<u8>, block: i32) {
        tag(out, FIFF_BLOCK_START, FIFFT_INT, &block.to_be_bytes(), NEXT_SEQ);
    }

    fn block_end(out: &mut Vec<u8>, block: i32, next: i32) {
        tag(out, FIFF_BLOCK_END, FIFFT_INT, &block.to_be_bytes(), next);
    }

    fn minimal_fif(secs: i32, his_id: Option<&str>) -> Vec<u8> {
        let mut out = Vec::new();
        tag(&mut out, FIFF_FILE_ID, FIFFT_ID_STRUCT, &[0u8; 20], NEXT_SEQ);
        block_start(&mut out, FIFFB_MEAS);
        block_start(&mut out, FIFFB_MEAS_INFO);
        if let Some(id) = his_id {
            block_start(&mut out, FIFFB_SUBJECT);
            tag(&mut out, FIFF_SUBJ_HIS_ID, FIFFT_STRING, id.as_bytes(), NEXT_SEQ);
            block_end(&mut out, FIFFB_SUBJECT, NEXT_SEQ);
        }
        tag(&mut out, FIFF_MEAS_DATE, FIFFT_INT, &meas_date_payload(secs, 250), NEXT_SEQ);
        block_end(&mut out, FIFFB_MEAS_INFO, NEXT_SEQ);
        tag(&mut out, FIFF_DATA_BUFFER, FIFFT_INT, &[0u8; 64], NEXT_SEQ);
        block_end(&mut out, FIFFB_MEAS, NEXT_NONE);
        out
    }

    #[test]
    fn reads_measurement_date_and_subject_id() {
        // 2022-01-01T10:00:00Z
        let bytes = minimal_fif(1_641_031_200, Some("012345"));
        let header = read_header(Cursor::new(bytes)).unwrap();

        assert_eq!(header.meas_secs, 1_641_031_200);
        assert_eq!(header.meas_usecs, 250);
        assert_eq!(header.subject_his_id.as_deref(), Some("012345"));
        assert_eq!(header.visit_date().unwrap().to_string(), "20220101");
    }

    #[test]
    fn subject_id_is_optional() {
        let bytes = minimal_fif(1_641_031_200, None);
        let header = read_header(Cursor::new(bytes)).unwrap();
        assert_eq!(header.subject_his_id, None);
    }

    #[test]
    fn follows_absolute_next_pointers() {
        let mut out = Vec::new();
        // file id (36 bytes) jumps over a 40-byte junk region to offset 76
        tag(&mut out, FIFF_FILE_ID, FIFFT_ID_STRUCT, &[0u8; 20], 76);
        out.extend_from_slice(&[0xAB; 40]);
        block_start(&mut out, FIFFB_MEAS_INFO);
        tag(
            &mut out,
            FIFF_MEAS_DATE,
            FIFFT_INT,
            &meas_date_payload(1_641_031_200, 0),
            NEXT_SEQ,
        );
        block_end(&mut out, FIFFB_MEAS_INFO, NEXT_NONE);

        let header = read_header(Cursor::new(out)).unwrap();
        assert_eq!(header.meas_secs, 1_641_031_200);
    }

    #[test]
    fn rejects_non_fif_input() {
        let mut out = Vec::new();
        tag(&mut out, FIFF_MEAS_DATE, FIFFT_INT, &meas_date_payload(1, 0), NEXT_NONE);
        assert!(matches!(
            read_header(Cursor::new(out)),
            Err(FifError::NotFif(FIFF_MEAS_DATE))
        ));
    }

    #[test]
    fn missing_meas_date_is_an_error() {
        let mut out = Vec::new();
        tag(&mut out, FIFF_FILE_ID, FIFFT_ID_STRUCT, &[0u8; 20], NEXT_SEQ);
        block_start(&mut out, FIFFB_MEAS_INFO);
        block_start(&mut out, FIFFB_SUBJECT);
        tag(&mut out, FIFF_SUBJ_HIS_ID, FIFFT_STRING, b"012345", NEXT_SEQ);
        block_end(&mut out, FIFFB_SUBJECT, NEXT_SEQ);
        block_end(&mut out, FIFFB_MEAS_INFO, NEXT_NONE);
        assert!(matches!(
            read_header(Cursor::new(out)),
            Err(FifError::MissingMeasDate)
        ));
    }

    #[test]
    fn empty_input_has_no_meas_date() {
        assert!(matches!(
            read_header(Cursor::new(Vec::new())),
            Err(FifError::MissingMeasDate)
        ));
    }

    #[test]
    fn truncated_header_is_reported() {
        let mut out = Vec::new();
        tag(&mut out, FIFF_FILE_ID, FIFFT_ID_STRUCT, &[0u8; 20], NEXT_SEQ);
        out.extend_from_slice(&[0u8; 7]);
        assert!(matches!(
            read_header(Cursor::new(out)),
            Err(FifError::Truncated(36))
        ));
    }

    #[test]
    fn short_meas_date_payload_is_corrupt() {
        let mut out = Vec::new();
        tag(&mut out, FIFF_FILE_ID, FIFFT_ID_STRUCT, &[0u8; 20], NEXT_SEQ);
        block_start(&mut out, FIFFB_MEAS_INFO);
        tag(&mut out, FIFF_MEAS_DATE, FIFFT_INT, &[0u8; 4], NEXT_NONE);
        assert!(matches!(
            read_header(Cursor::new(out)),
            Err(FifError::CorruptTag { .. })
        ));
    }

    #[test]
    fn date_outside_meas_info_is_ignored() {
        let mut out = Vec::new();
        tag(&mut out, FIFF_FILE_ID, FIFFT_ID_STRUCT, &[0u8; 20], NEXT_SEQ);
        block_start(&mut out, FIFFB_MEAS);
        block_start(&mut out, FIFFB_PROCESSING_HISTORY);
        // 2019-03-04, the date of an earlier processing step
        tag(&mut out, FIFF_MEAS_DATE, FIFFT_INT, &meas_date_payload(1_551_700_800, 0), NEXT_SEQ);
        tag(&mut out, FIFF_SUBJ_HIS_ID, FIFFT_STRING, b"999999", NEXT_SEQ);
        block_end(&mut out, FIFFB_PROCESSING_HISTORY, NEXT_SEQ);
        block_start(&mut out, FIFFB_MEAS_INFO);
        block_start(&mut out, FIFFB_SUBJECT);
        tag(&mut out, FIFF_SUBJ_HIS_ID, FIFFT_STRING, b"012345", NEXT_SEQ);
        block_end(&mut out, FIFFB_SUBJECT, NEXT_SEQ);
        tag(&mut out, FIFF_MEAS_DATE, FIFFT_INT, &meas_date_payload(1_641_031_200, 0), NEXT_SEQ);
        block_end(&mut out, FIFFB_MEAS_INFO, NEXT_SEQ);
        block_end(&mut out, FIFFB_MEAS, NEXT_NONE);

        let header = read_header(Cursor::new(out)).unwrap();
        assert_eq!(header.meas_secs, 1_641_031_200);
        assert_eq!(header.subject_his_id.as_deref(), Some("012345"));
    }

    #[test]
    fn date_only_outside_meas_info_is_missing() {
        let mut out = Vec::new();
        tag(&mut out, FIFF_FILE_ID, FIFFT_ID_STRUCT, &[0u8; 20], NEXT_SEQ);
        block_start(&mut out, FIFFB_PROCESSING_HISTORY);
        tag(&mut out, FIFF_MEAS_DATE, FIFFT_INT, &meas_date_payload(1_641_031_200, 0), NEXT_SEQ);
        block_end(&mut out, FIFFB_PROCESSING_HISTORY, NEXT_SEQ);
        tag(&mut out, FIFF_MEAS_DATE, FIFFT_INT, &meas_date_payload(1_641_031_200, 0), NEXT_NONE);
        assert!(matches!(
            read_header(Cursor::new(out)),
            Err(FifError::MissingMeasDate)
        ));
    }

    #[test]
    fn walk_stops_when_meas_info_closes() {
        let mut out = minimal_fif(1_641_031_200, None);
        // Replace the trailing data buffer chain with a truncated tag header.
        let end_of_meas_info = out.len() - (16 + 64) - (16 + 4);
        out.truncate(end_of_meas_info);
        out.extend_from_slice(&[0u8; 5]);

        let header = read_header(Cursor::new(out)).unwrap();
        assert_eq!(header.meas_secs, 1_641_031_200);
        assert_eq!(header.subject_his_id, None);
    }

    #[test]
    fn short_block_start_payload_is_corrupt() {
        let mut out = Vec::new();
        tag(&mut out, FIFF_FILE_ID, FIFFT_ID_STRUCT, &[0u8; 20], NEXT_SEQ);
        tag(&mut out, FIFF_BLOCK_START, FIFFT_INT, &[0u8; 2], NEXT_NONE);
        assert!(matches!(
            read_header(Cursor::new(out)),
            Err(FifError::CorruptTag { .. })
        ));
    }

    #[test]
    fn reads_from_disk() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("012345_AttenAud_raw.fif");
        std::fs::write(&path, minimal_fif(1_641_031_200, Some("012345"))).unwrap();

        let header = crate::read_measurement_header(&path).unwrap();
        assert_eq!(header.visit_date().unwrap().to_string(), "20220101");
    }
}
