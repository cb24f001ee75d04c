//! Icon management for tray application

use anyhow::{Context, Result};
use image::GenericImageView;
use std::path::PathBuf;
use tracing::debug;
use tray_icon::Icon;

/// Edge length of the built-in icons
const ICON_SIZE: u32 = 32;

const PLAYING_COLOR: [u8; 4] = [0x2e, 0xa0, 0x43, 0xff];
const STOPPED_COLOR: [u8; 4] = [0x80, 0x80, 0x80, 0xff];

/// Icon manager for the playing and stopped states
pub struct IconManager {
    playing_icon: Icon,
    stopped_icon: Icon,
}

impl IconManager {
    /// Load icons from the asset directory, drawing built-in ones for any
    /// file that is missing or unreadable
    pub fn new() -> Result<Self> {
        let playing_icon = Self::load_icon_from_file("assets/icons/tray/playing.png")
            .or_else(|e| {
                debug!("Using built-in playing icon: {:#}", e);
                Self::builtin_icon(PLAYING_COLOR, true)
            })?;
        let stopped_icon = Self::load_icon_from_file("assets/icons/tray/stopped.png")
            .or_else(|e| {
                debug!("Using built-in stopped icon: {:#}", e);
                Self::builtin_icon(STOPPED_COLOR, false)
            })?;

        Ok(Self {
            playing_icon,
            stopped_icon,
        })
    }

    /// Get asset path relative to executable
    ///
    /// Searches in order:
    /// 1. Executable directory
    /// 2. Current working directory (development)
    fn get_asset_path(relative_path: &str) -> Result<PathBuf> {
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let path = exe_dir.join(relative_path);
                if path.exists() {
                    return Ok(path);
                }
            }
        }

        let cwd_path = std::env::current_dir()
            .context("Failed to get current directory")?
            .join(relative_path);

        if cwd_path.exists() {
            return Ok(cwd_path);
        }

        anyhow::bail!(
            "Asset not found: {} (searched in exe dir and current dir)",
            relative_path
        )
    }

    /// Load icon from PNG file
    fn load_icon_from_file(path: &str) -> Result<Icon> {
        let full_path = Self::get_asset_path(path)?;
        let img = image::open(&full_path)
            .with_context(|| format!("Failed to load icon: {:?}", full_path))?;
        let (width, height) = img.dimensions();
        let rgba = img.into_rgba8().into_raw();
        Ok(Icon::from_rgba(rgba, width, height)?)
    }

    /// Draw a speaker glyph, with sound waves when `waves` is set
    fn builtin_icon(color: [u8; 4], waves: bool) -> Result<Icon> {
        let mut rgba = vec![0u8; (ICON_SIZE * ICON_SIZE * 4) as usize];

        for y in 0..ICON_SIZE {
            for x in 0..ICON_SIZE {
                let (fx, fy) = (x as f32 + 0.5, y as f32 + 0.5);
                let dy = (fy - 16.0).abs();

                let body = (4.0..10.0).contains(&fx) && dy < 4.0;
                let cone = (10.0..17.0).contains(&fx) && dy < 4.0 + (fx - 10.0);
                let wave = waves && fx > 18.0 && {
                    let r = ((fx - 17.0).powi(2) + (fy - 16.0).powi(2)).sqrt();
                    ((r - 6.0).abs() < 1.2 || (r - 11.0).abs() < 1.2) && dy < r * 0.75
                };

                if body || cone || wave {
                    let i = ((y * ICON_SIZE + x) * 4) as usize;
                    rgba[i..i + 4].copy_from_slice(&color);
                }
            }
        }

        Ok(Icon::from_rgba(rgba, ICON_SIZE, ICON_SIZE)?)
    }

    /// Icon for the given playback state
    pub fn icon_for(&self, playing: bool) -> Icon {
        if playing {
            self.playing_icon.clone()
        } else {
            self.stopped_icon.clone()
        }
    }
}
