//! ---
//! dcse_section: "04-configuration-orchestration"
//! dcse_subsection: "module"
//! dcse_type: "source"
//! dcse_scope: "code"
//! dcse_description: "Calibration profile loading and persistence helpers."
//! dcse_version: "v0.0.0-prealpha"
//! dcse_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use dcse_calc_engine::calibration::CalibrationSnapshot;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

const PROFILES_DIR: &str = "profiles";
const CURRENT_LINK: &str = "current.toml";

/// Metadata describing a calibration profile stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileMetadata {
    /// Human-readable profile name supplied by the operator.
    pub name: String,
    /// Filesystem-safe slug generated from the profile name.
    pub slug: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// SHA-256 hash of the calibration factors.
    pub calibration_hash: String,
    /// Version of the tooling that produced the manifest.
    pub source_version: String,
}

/// Calibration snapshot wrapped with profile metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalibrationManifest {
    pub profile: ProfileMetadata,
    #[serde(flatten)]
    pub calibration: CalibrationSnapshot,
}

#[derive(Debug, Clone)]
pub struct PersistedProfile {
    pub manifest: CalibrationManifest,
    pub manifest_path: PathBuf,
    pub current_path: PathBuf,
}

impl PersistedProfile {
    pub fn calibration_hash(&self) -> &str {
        &self.manifest.profile.calibration_hash
    }
}

/// Canonical profile paths below a root directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfilePaths {
    pub root: PathBuf,
    pub profiles_dir: PathBuf,
    pub current_symlink: PathBuf,
}

impl ProfilePaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref().to_path_buf();
        let profiles_dir = root.join(PROFILES_DIR);
        let current_symlink = root.join(CURRENT_LINK);
        Self {
            root,
            profiles_dir,
            current_symlink,
        }
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.profiles_dir).with_context(|| {
            format!(
                "unable to create profiles directory {}",
                self.profiles_dir.display()
            )
        })
    }
}

impl CalibrationManifest {
    /// Construct a manifest from a profile name and a validated snapshot.
    pub fn new(name: impl Into<String>, calibration: CalibrationSnapshot) -> Result<Self> {
        let name = name.into().trim().to_owned();
        if name.is_empty() {
            return Err(anyhow!("profile name cannot be empty"));
        }
        let slug = slugify_name(&name);
        if slug.is_empty() {
            return Err(anyhow!(
                "profile name must contain at least one alphanumeric character"
            ));
        }
        calibration
            .validate()
            .with_context(|| format!("calibration for profile '{name}' is invalid"))?;
        let now = Utc::now();
        let mut manifest = Self {
            profile: ProfileMetadata {
                name,
                slug,
                created_at: now,
                updated_at: now,
                calibration_hash: String::new(),
                source_version: env!("CARGO_PKG_VERSION").to_owned(),
            },
            calibration,
        };
        manifest.update_digest()?;
        Ok(manifest)
    }

    pub fn slug(&self) -> &str {
        &self.profile.slug
    }

    /// Recompute the calibration hash and bump `updated_at`.
    pub fn update_digest(&mut self) -> Result<()> {
        self.profile.calibration_hash = hash_calibration(&self.calibration)?;
        self.profile.updated_at = Utc::now();
        Ok(())
    }

    /// Write `profiles/<slug>.toml` under `root` and point `current.toml` at it.
    pub fn persist(mut self, root: impl AsRef<Path>) -> Result<PersistedProfile> {
        self.update_digest()?;
        let paths = ProfilePaths::new(root);
        paths.ensure_dirs()?;

        let filename = format!("{}.toml", self.profile.slug);
        let manifest_path = paths.profiles_dir.join(&filename);
        let serialized = toml::to_string_pretty(&self)
            .with_context(|| "failed to serialise calibration manifest to TOML")?;
        fs::write(&manifest_path, serialized)
            .with_context(|| format!("unable to write manifest to {}", manifest_path.display()))?;

        // Link target is relative to the root directory.
        create_symlink(&Path::new(PROFILES_DIR).join(filename), &paths.current_symlink)?;
        info!(
            profile = %self.profile.slug,
            hash = %self.profile.calibration_hash,
            "calibration profile persisted"
        );

        Ok(PersistedProfile {
            manifest: self,
            manifest_path,
            current_path: paths.current_symlink,
        })
    }
}

pub fn load_manifest(path: impl AsRef<Path>) -> Result<CalibrationManifest> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read manifest {}", path.display()))?;
    let manifest: CalibrationManifest = toml::from_str(&raw)
        .with_context(|| format!("failed to parse manifest {}", path.display()))?;
    manifest
        .calibration
        .validate()
        .with_context(|| format!("manifest {} holds an invalid calibration", path.display()))?;
    Ok(manifest)
}

/// Load the profile referenced by `current.toml`, if any.
pub fn load_active_profile(root: impl AsRef<Path>) -> Result<Option<CalibrationManifest>> {
    let paths = ProfilePaths::new(root);
    if !paths.current_symlink.exists() {
        return Ok(None);
    }
    let target = fs::read_link(&paths.current_symlink)
        .map(|link| paths.root.join(link))
        .unwrap_or_else(|_| paths.current_symlink.clone());
    let manifest = load_manifest(&target).with_context(|| {
        format!(
            "unable to load manifest referenced by {}",
            paths.current_symlink.display()
        )
    })?;
    Ok(Some(manifest))
}

/// Calibration the engine should run with: the active profile or identity.
pub fn active_calibration(root: impl AsRef<Path>) -> Result<CalibrationSnapshot> {
    Ok(load_active_profile(root)?
        .map(|manifest| manifest.calibration)
        .unwrap_or_default())
}

/// Drop the active pointer so the engine falls back to identity. Stored
/// profiles are kept. Returns whether a pointer was removed.
pub fn reset_active_profile(root: impl AsRef<Path>) -> Result<bool> {
    let paths = ProfilePaths::new(root);
    match fs::symlink_metadata(&paths.current_symlink) {
        Ok(_) => {
            fs::remove_file(&paths.current_symlink).with_context(|| {
                format!(
                    "unable to remove active profile link {}",
                    paths.current_symlink.display()
                )
            })?;
            info!("active calibration profile cleared");
            Ok(true)
        }
        Err(_) => Ok(false),
    }
}

/// Compute the SHA-256 hash of a calibration snapshot's TOML form.
pub fn hash_calibration(calibration: &CalibrationSnapshot) -> Result<String> {
    let serialised = toml::to_string(calibration)
        .with_context(|| "failed to serialise calibration for hashing")?;
    let mut hasher = Sha256::new();
    hasher.update(serialised.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// Produce a filesystem-safe slug from a human-friendly profile name.
pub fn slugify_name(input: &str) -> String {
    let mut slug = String::new();
    let mut previous_dash = false;
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            previous_dash = false;
        } else if matches!(ch, ' ' | '-' | '_' | '.' | '/') && !previous_dash && !slug.is_empty() {
            slug.push('-');
            previous_dash = true;
        }
    }
    if slug.ends_with('-') {
        slug.pop();
    }
    slug
}

fn create_symlink(target: &Path, link: &Path) -> Result<()> {
    if let Ok(meta) = fs::symlink_metadata(link) {
        if meta.is_dir() {
            return Err(anyhow!(
                "expected symlink or file at {} but found directory",
                link.display()
            ));
        }
        fs::remove_file(link)
            .with_context(|| format!("unable to remove existing link {}", link.display()))?;
    }
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(target, link).with_context(|| {
            format!(
                "unable to update symlink {} -> {}",
                link.display(),
                target.display()
            )
        })?;
    }
    #[cfg(windows)]
    {
        std::os::windows::fs::symlink_file(target, link).with_context(|| {
            format!(
                "unable to update symlink {} -> {}",
                link.display(),
                target.display()
            )
        })?;
    }
    Ok(())
}
