// AudSleuth - core/detect.rs
//
// Layout detection from the two leading raw bytes of an audit file.
// Core layer: accepts Read + Seek trait objects, never opens files itself.

use crate::core::model::{signature_hex, LayoutVariant};
use crate::util::constants::SIGNATURE_LEN;
use crate::util::error::DetectionError;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;

/// Read the layout signature from the start of `reader` and rewind it.
///
/// Exactly two raw bytes are inspected. On success the stream is positioned
/// at offset 0 so the first block read starts at the signature itself.
/// `path` is only used for error context.
pub fn detect_layout<R: Read + Seek>(
    reader: &mut R,
    path: &Path,
) -> Result<LayoutVariant, DetectionError> {
    let io_err = |source| DetectionError::Io {
        path: path.to_path_buf(),
        source,
    };

    reader.seek(SeekFrom::Start(0)).map_err(io_err)?;

    let mut signature = [0u8; SIGNATURE_LEN];
    let mut filled = 0;
    while filled < SIGNATURE_LEN {
        match reader.read(&mut signature[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(io_err(e)),
        }
    }

    reader.seek(SeekFrom::Start(0)).map_err(io_err)?;

    if filled < SIGNATURE_LEN {
        return Err(DetectionError::Truncated {
            path: path.to_path_buf(),
            len: filled,
        });
    }

    match LayoutVariant::from_signature(signature) {
        Some(variant) => {
            tracing::debug!(
                file = %path.display(),
                signature = %signature_hex(&signature),
                layout = %variant,
                "Layout detected"
            );
            Ok(variant)
        }
        None => Err(DetectionError::UnknownSignature {
            path: path.to_path_buf(),
            signature: signature_hex(&signature),
        }),
    }
}
