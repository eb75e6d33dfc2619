use logbook_core::{project_key_from_cwd, project_key_from_dir, signature_of};
use logbook_types::{Details, ResumeInfo, ResumeMode, Summary, truncate};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::Result;
use crate::classify::{LineRecord, classify_line};
use crate::filename::parse_log_file_name;
use crate::fold::FoldState;
use crate::schema::{LegacyHeader, TypedRecord};
use crate::time::parse_timestamp_ms;

const TITLE_MAX_CHARS: usize = 80;

/// Tuning knobs for the cheap Summary pass.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// How much of the file prefix the Summary pass reads.
    pub summary_prefix_bytes: usize,
    /// Cap on the tier-3 streaming scan for a working directory.
    pub cwd_scan_limit_bytes: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            summary_prefix_bytes: 128 * 1024,
            cwd_scan_limit_bytes: 4 * 1024 * 1024,
        }
    }
}

/// Identity extracted from the file's first record.
struct HeaderInfo {
    id: Option<String>,
    raw_timestamp: Option<String>,
    resume: ResumeInfo,
}

/// Full strict parse: every line classified and folded into the normalized
/// message list. Unparsable lines are counted, never fatal.
pub fn parse_details(path: &Path) -> Result<Details> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut state = FoldState::new(true);
    let mut header: Option<HeaderInfo> = None;
    let mut first = true;

    let mut buf = Vec::new();
    loop {
        buf.clear();
        let n = reader.read_until(b'\n', &mut buf)?;
        if n == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let record = classify_line(trimmed);
        if first {
            first = false;
            match take_header(&mut state, record, trimmed) {
                Ok(info) => header = Some(info),
                Err(record) => state.fold(record, trimmed),
            }
        } else {
            state.fold(record, trimmed);
        }
    }

    Ok(finalize(path, state, header))
}

/// Cheap partial parse limited to a prefix of the file, plus the bounded
/// tier-3 scan when the prefix did not yield a working directory.
pub fn parse_summary(path: &Path, options: &ParseOptions) -> Result<Summary> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut state = FoldState::new(false);
    let mut header: Option<HeaderInfo> = None;
    let mut first = true;

    let mut consumed = 0usize;
    let mut buf = Vec::new();
    while consumed < options.summary_prefix_bytes {
        buf.clear();
        let n = reader.read_until(b'\n', &mut buf)?;
        if n == 0 {
            break;
        }
        consumed += n;
        if consumed > options.summary_prefix_bytes && buf.last() != Some(&b'\n') {
            // Partial line at the budget edge; leave it to the tier-3 scan.
            break;
        }

        let line = String::from_utf8_lossy(&buf);
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let record = classify_line(trimmed);
        if first {
            first = false;
            match take_header(&mut state, record, trimmed) {
                Ok(info) => header = Some(info),
                Err(record) => state.fold(record, trimmed),
            }
        } else {
            state.fold(record, trimmed);
        }
    }

    if !state.has_cwd() {
        let mut scanned = 0usize;
        while scanned < options.cwd_scan_limit_bytes {
            buf.clear();
            let n = reader.read_until(b'\n', &mut buf)?;
            if n == 0 {
                break;
            }
            scanned += n;
            let line = String::from_utf8_lossy(&buf);
            state.absorb_text_for_cwd(&line);
            if state.has_cwd() {
                break;
            }
        }
    }

    let details = finalize(path, state, header);
    Ok(details.to_summary(path.to_path_buf()))
}

/// Consume line 0 when it is a header (typed envelope or bare legacy pair);
/// hand the record back otherwise so it folds like any other line.
fn take_header(
    state: &mut FoldState,
    record: LineRecord,
    raw_line: &str,
) -> std::result::Result<HeaderInfo, LineRecord> {
    match record {
        LineRecord::Typed(boxed) => match *boxed {
            TypedRecord::SessionMeta(meta) => {
                state.add_shell_hint(raw_line);
                if let Some(cwd) = &meta.payload.cwd {
                    state.note_structured_cwd(cwd);
                }
                if let Some(shell) = &meta.payload.shell {
                    state.note_shell_field(shell);
                }
                if let Some(instructions) = &meta.payload.instructions {
                    state.push_header_instructions(instructions);
                }
                Ok(HeaderInfo {
                    id: meta.payload.id.clone(),
                    raw_timestamp: meta.payload.timestamp.or(meta.timestamp),
                    resume: ResumeInfo {
                        mode: ResumeMode::Modern,
                        id: meta.payload.id,
                    },
                })
            }
            other => Err(LineRecord::Typed(Box::new(other))),
        },
        LineRecord::HeaderLike(value) => {
            match serde_json::from_value::<LegacyHeader>(value.clone()) {
                Ok(legacy) => {
                    state.add_shell_hint(raw_line);
                    if let Some(cwd) = &legacy.cwd {
                        state.note_structured_cwd(cwd);
                    }
                    if let Some(shell) = &legacy.shell {
                        state.note_shell_field(shell);
                    }
                    if let Some(instructions) = &legacy.instructions {
                        state.push_header_instructions(instructions);
                    }
                    Ok(HeaderInfo {
                        id: Some(legacy.id.clone()),
                        raw_timestamp: legacy.timestamp,
                        resume: ResumeInfo {
                            mode: ResumeMode::Legacy,
                            id: Some(legacy.id),
                        },
                    })
                }
                Err(_) => Err(LineRecord::HeaderLike(value)),
            }
        }
        other => Err(other),
    }
}

fn finalize(path: &Path, state: FoldState, header: Option<HeaderInfo>) -> Details {
    let file_name = parse_log_file_name(path);

    let id = header
        .as_ref()
        .and_then(|h| h.id.clone())
        .or_else(|| file_name.as_ref().map(|f| f.id.clone()))
        .unwrap_or_else(|| {
            path.file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.to_string_lossy().into_owned())
        });

    let raw_timestamp = header.as_ref().and_then(|h| h.raw_timestamp.clone());
    let timestamp_ms = raw_timestamp
        .as_deref()
        .and_then(parse_timestamp_ms)
        .or_else(|| file_name.as_ref().and_then(|f| f.timestamp_ms))
        .or_else(|| {
            signature_of(path)
                .ok()
                .flatten()
                .map(|sig| sig.mtime_ms)
        })
        .unwrap_or(0);

    let resume = header
        .map(|h| h.resume)
        .unwrap_or_else(ResumeInfo::unknown);

    let working_dir = state.resolved_cwd();
    let project_key = working_dir
        .as_deref()
        .map(project_key_from_cwd)
        .unwrap_or_else(|| project_key_from_dir(path));

    let shell_kind = state.shell();
    let preview = state.preview.clone();
    let title = preview
        .as_deref()
        .map(|p| truncate(p, TITLE_MAX_CHARS))
        .unwrap_or_else(|| id.clone());

    Details {
        id,
        title,
        timestamp_ms,
        messages: state.messages,
        skipped_line_count: state.skipped,
        raw_timestamp_text: raw_timestamp,
        working_dir,
        project_key,
        preview,
        resume,
        shell_kind,
    }
}
