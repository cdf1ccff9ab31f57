//! Voice registration records.
//!
//! Registration is an offline administrative step: it produces the registry
//! keys through which the host discovers the voice and instantiates the
//! engine. The engine itself never reads them.
//!
//! Output is a `.reg` script so installation stays a plain `reg import`.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;
use tracing::info;
use uuid::Uuid;

/// Class identifier of the replay engine's COM class
pub const ENGINE_CLSID: Uuid = Uuid::from_u128(0x4DFF_D59B_4DF3_4366_B053_DFF9_BE00_2EFB);

/// Native voice token root
pub const VOICE_TOKENS_PATH: &str = r"SOFTWARE\Microsoft\Speech\Voices\Tokens";

/// Voice token root seen by 32-bit processes on 64-bit Windows
pub const VOICE_TOKENS_PATH_WOW64: &str = r"SOFTWARE\WOW6432Node\Microsoft\Speech\Voices\Tokens";

/// Gender attribute of a voice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    /// Male voice
    Male,
    /// Female voice
    Female,
    /// Non-binary or neutral voice
    Neutral,
}

impl Gender {
    /// Registry attribute value
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Neutral => "neutral",
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Voice token persisted for host voice discovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceRegistryEntry {
    /// Engine class instantiated for this voice
    pub clsid: Uuid,
    /// Token key name
    pub id: String,
    /// Human-readable name
    pub display_name: String,
    /// Hexadecimal LANGID list, e.g. `"409"` for en-US
    pub language: String,
    /// Voice gender
    pub gender: Gender,
    /// Vendor attribute
    pub vendor: String,
}

impl Default for VoiceRegistryEntry {
    fn default() -> Self {
        Self {
            clsid: ENGINE_CLSID,
            id: "ReplayVoice".to_string(),
            display_name: "Replay Voice".to_string(),
            language: "409".to_string(),
            gender: Gender::Male,
            vendor: "Replay Voice".to_string(),
        }
    }
}

impl VoiceRegistryEntry {
    /// Validate the entry
    ///
    /// # Errors
    ///
    /// Returns an error if the id is empty or would escape the token root, or
    /// the language is not a hexadecimal LANGID list
    pub fn validate(&self) -> EngineResult<()> {
        if self.id.is_empty() || self.id.contains('\\') {
            return Err(EngineError::invalid_input(format!(
                "Voice id '{}' must be a single, non-empty key name",
                self.id
            )));
        }

        let valid_language = !self.language.is_empty()
            && self
                .language
                .split(';')
                .all(|lang| !lang.is_empty() && lang.chars().all(|c| c.is_ascii_hexdigit()));
        if !valid_language {
            return Err(EngineError::invalid_input(format!(
                "Language '{}' must be hexadecimal LANGIDs separated by ';'",
                self.language
            )));
        }

        Ok(())
    }

    /// Primary LANGID, the first entry of the language list
    #[must_use]
    pub fn primary_language(&self) -> &str {
        self.language.split(';').next().unwrap_or_default()
    }

    /// Token key paths under `HKEY_LOCAL_MACHINE`, native view first
    #[must_use]
    pub fn registry_paths(&self) -> [String; 2] {
        [
            format!(r"{VOICE_TOKENS_PATH}\{}", self.id),
            format!(r"{VOICE_TOKENS_PATH_WOW64}\{}", self.id),
        ]
    }
}

/// In-process COM server registration for the engine class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComServerEntry {
    /// Class identifier
    pub clsid: Uuid,
    /// Class description
    pub description: String,
    /// Versioned ProgID
    pub prog_id: String,
    /// Version-independent ProgID
    pub version_independent_prog_id: String,
    /// Path of the engine DLL
    pub server_path: String,
    /// Apartment model
    pub threading_model: String,
}

impl Default for ComServerEntry {
    fn default() -> Self {
        Self {
            clsid: ENGINE_CLSID,
            description: "Replay Voice Text-To-Speech Engine".to_string(),
            prog_id: "ReplayVoice.TTSEngine.1".to_string(),
            version_independent_prog_id: "ReplayVoice.TTSEngine".to_string(),
            server_path: "replay_voice_sapi.dll".to_string(),
            threading_model: "Both".to_string(),
        }
    }
}

/// Registration manifest rendered to a `.reg` script
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationScript {
    /// COM class registration; omitted when `None`
    pub server: Option<ComServerEntry>,
    /// Voice token
    pub voice: VoiceRegistryEntry,
}

impl RegistrationScript {
    /// Script registering both the COM class and the voice
    #[must_use]
    pub fn new(server: ComServerEntry, voice: VoiceRegistryEntry) -> Self {
        Self {
            server: Some(server),
            voice,
        }
    }

    /// Parse a manifest with `[server]` and `[voice]` tables
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or the voice fails validation
    pub fn from_toml_str(text: &str) -> EngineResult<Self> {
        let script: Self = toml::from_str(text)?;
        script.validate()?;
        Ok(script)
    }

    /// Validate the manifest
    ///
    /// # Errors
    ///
    /// Returns an error if the voice entry is invalid or its class differs
    /// from the registered server's class
    pub fn validate(&self) -> EngineResult<()> {
        self.voice.validate()?;
        if let Some(server) = &self.server {
            if server.clsid != self.voice.clsid {
                return Err(EngineError::invalid_input(format!(
                    "Voice '{}' names class {} but the server registers {}",
                    self.voice.id,
                    braced(&self.voice.clsid),
                    braced(&server.clsid)
                )));
            }
        }
        Ok(())
    }

    /// Render the `.reg` script
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::from("Windows Registry Editor Version 5.00\n");

        if let Some(server) = &self.server {
            let clsid = braced(&server.clsid);
            let class_key = format!(r"HKEY_CLASSES_ROOT\CLSID\{clsid}");
            push_key(&mut out, &class_key, &[(None, server.description.as_str())]);
            push_key(
                &mut out,
                &format!(r"{class_key}\InprocServer32"),
                &[
                    (None, server.server_path.as_str()),
                    (Some("ThreadingModel"), server.threading_model.as_str()),
                ],
            );
            push_key(&mut out, &format!(r"{class_key}\ProgID"), &[(None, server.prog_id.as_str())]);
            push_key(
                &mut out,
                &format!(r"{class_key}\VersionIndependentProgID"),
                &[(None, server.version_independent_prog_id.as_str())],
            );
            for prog_id in [&server.prog_id, &server.version_independent_prog_id] {
                let prog_key = format!(r"HKEY_CLASSES_ROOT\{prog_id}");
                push_key(&mut out, &prog_key, &[(None, server.description.as_str())]);
                push_key(&mut out, &format!(r"{prog_key}\CLSID"), &[(None, clsid.as_str())]);
            }
        }

        let voice = &self.voice;
        let clsid = braced(&voice.clsid);
        for path in voice.registry_paths() {
            let token_key = format!(r"HKEY_LOCAL_MACHINE\{path}");
            push_key(
                &mut out,
                &token_key,
                &[
                    (None, voice.display_name.as_str()),
                    (Some(voice.primary_language()), voice.display_name.as_str()),
                    (Some("CLSID"), clsid.as_str()),
                ],
            );
            push_key(
                &mut out,
                &format!(r"{token_key}\Attributes"),
                &[
                    (Some("Language"), voice.language.as_str()),
                    (Some("Gender"), voice.gender.as_str()),
                    (Some("Vendor"), voice.vendor.as_str()),
                    (Some("Name"), voice.display_name.as_str()),
                ],
            );
        }

        out
    }

    /// Write the rendered script to `path`
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest is invalid or the file cannot be written
    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> EngineResult<()> {
        let path = path.as_ref();
        self.validate()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                EngineError::file(format!("Failed to create directory {}: {e}", parent.display()))
            })?;
        }

        std::fs::write(path, self.render()).map_err(|e| {
            EngineError::file(format!("Failed to write {}: {e}", path.display()))
        })?;
        info!("Wrote registration script for '{}' to {}", self.voice.id, path.display());
        Ok(())
    }
}

/// `{XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX}` in the registry's upper-case form
fn braced(id: &Uuid) -> String {
    format!("{{{}}}", id.hyphenated().to_string().to_uppercase())
}

fn push_key(out: &mut String, key: &str, values: &[(Option<&str>, &str)]) {
    let _ = write!(out, "\n[{key}]\n");
    for (name, value) in values {
        let value = escape(value);
        let _ = match name {
            None => writeln!(out, "@=\"{value}\""),
            Some(name) => writeln!(out, "\"{}\"=\"{value}\"", escape(name)),
        };
    }
}

fn escape(value: &str) -> String {
    value.replace('\\', r"\\").replace('"', "\\\"")
}
