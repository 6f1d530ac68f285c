//! Text enhancement through an external command
//!
//! Each action carries a fixed instruction. The configured program receives
//! the instruction as its last argument and the document on stdin, and must
//! print the complete revised document on stdout. Whatever goes wrong, the
//! document buffer is only touched once a non-empty result is in hand.

use crate::config::EnhanceConfig;
use crate::editor::DocumentBuffer;
use crate::error::EnhanceError;
use std::io::Write;
use std::process::{Command, Stdio};

/// Fixed set of enhancement instructions
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum EnhanceAction {
    /// Fix grammar and spelling
    Grammar,
    /// Rewrite in a professional tone
    Tone,
    /// Insert a summary at the top
    Summary,
    /// Insert a table of contents
    Toc,
}

impl EnhanceAction {
    pub const ALL: [EnhanceAction; 4] = [
        EnhanceAction::Grammar,
        EnhanceAction::Tone,
        EnhanceAction::Summary,
        EnhanceAction::Toc,
    ];

    /// Instruction passed to the enhancement command
    pub fn prompt(&self) -> &'static str {
        match self {
            EnhanceAction::Grammar => {
                "Fix grammar and spelling in the following markdown document. \
                 Keep the structure, frontmatter and page-break markers unchanged. \
                 Return only the full corrected markdown."
            }
            EnhanceAction::Tone => {
                "Rewrite the following markdown document in a clear, professional tone. \
                 Keep the structure, frontmatter and page-break markers unchanged. \
                 Return only the full rewritten markdown."
            }
            EnhanceAction::Summary => {
                "Insert a short summary section after the frontmatter of the following \
                 markdown document. Leave the rest unchanged. \
                 Return only the full markdown."
            }
            EnhanceAction::Toc => {
                "Insert a table of contents listing the document's headings after the \
                 frontmatter of the following markdown document. Leave the rest unchanged. \
                 Return only the full markdown."
            }
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            EnhanceAction::Grammar => "Fix grammar",
            EnhanceAction::Tone => "Professional tone",
            EnhanceAction::Summary => "Add summary",
            EnhanceAction::Toc => "Add table of contents",
        }
    }
}

/// Produces a revised document for an action
pub trait TextEnhancer: Send + Sync {
    fn enhance(&self, action: EnhanceAction, document: &str) -> Result<String, EnhanceError>;
}

/// Runs a configured program: document on stdin, prompt as last argument
#[derive(Debug, Clone)]
pub struct CommandEnhancer {
    program: String,
    args: Vec<String>,
}

impl CommandEnhancer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_config(config: &EnhanceConfig) -> Result<Self, EnhanceError> {
        let (program, args) = config
            .command
            .split_first()
            .ok_or(EnhanceError::NotConfigured)?;
        if program.trim().is_empty() {
            return Err(EnhanceError::NotConfigured);
        }
        Ok(Self::new(program.clone(), args.to_vec()))
    }
}

impl TextEnhancer for CommandEnhancer {
    fn enhance(&self, action: EnhanceAction, document: &str) -> Result<String, EnhanceError> {
        log::debug!("running {} for {:?}", self.program, action);
        let spawn_error = |source| EnhanceError::Spawn {
            program: self.program.clone(),
            source,
        };

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(action.prompt())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;

        // Feed stdin from a separate thread so a chatty child cannot deadlock us
        let writer = child.stdin.take().map(|mut stdin| {
            let input = document.to_owned();
            std::thread::spawn(move || stdin.write_all(input.as_bytes()))
        });

        let output = child.wait_with_output().map_err(spawn_error)?;
        if let Some(handle) = writer {
            if let Ok(Err(e)) = handle.join() {
                // A child that exits without reading stdin reports a broken pipe
                log::debug!("enhancement command closed stdin early: {}", e);
            }
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            log::warn!(
                "enhancement command failed ({}): {}",
                output.status,
                stderr.trim()
            );
            return Err(EnhanceError::CommandFailed(output.status.to_string()));
        }

        let text = String::from_utf8(output.stdout).map_err(|_| EnhanceError::InvalidOutput)?;
        if text.trim().is_empty() {
            return Err(EnhanceError::EmptyOutput);
        }
        Ok(text)
    }
}

/// Replace the buffer with the enhanced document. Returns the new version.
///
/// On error the buffer is left as it was.
pub fn apply_enhancement(
    buffer: &mut DocumentBuffer,
    enhancer: &dyn TextEnhancer,
    action: EnhanceAction,
) -> Result<u64, EnhanceError> {
    let revised = enhancer.enhance(action, &buffer.normalized_text())?;
    buffer.set_text(&revised);
    log::info!("{} applied (version {})", action.display_name(), buffer.version());
    Ok(buffer.version())
}
