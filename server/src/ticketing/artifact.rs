//! Printable ticket images and the blob store they are kept in.

use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use font8x8::{UnicodeFonts, BASIC_FONTS, LATIN_FONTS};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use thiserror::Error;

use super::credential::{self, CodecError};
use crate::models::Booking;

pub const CANVAS_WIDTH: u32 = 800;
pub const CANVAS_HEIGHT: u32 = 400;
pub const ARTIFACT_EXTENSION: &str = "png";

const SYMBOL_ORIGIN: (i64, i64) = (500, 100);
const TEXT_LEFT: u32 = 50;
const TEXT_LINES: [u32; 4] = [50, 80, 110, 140];
/// Text stops before it would run into the symbol.
const TEXT_RIGHT_EDGE: u32 = 490;
const GLYPH_SCALE: u32 = 2;
const GLYPH_ADVANCE: u32 = 8 * GLYPH_SCALE;
const INK: Rgb<u8> = Rgb([0, 0, 0]);
const PAPER: Rgb<u8> = Rgb([255, 255, 255]);

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("artifact I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("'{0}' is not a valid artifact key")]
    InvalidKey(String),

    #[error("rendering task failed: {0}")]
    Task(String),
}

/// Composes the printable ticket: background, four text lines and the QR
/// symbol at fixed positions.
#[derive(Debug, Clone, Default)]
pub struct ArtifactRenderer {
    template: Option<RgbImage>,
}

impl ArtifactRenderer {
    /// A renderer drawing on a plain white canvas.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a background template. A missing or unreadable template falls
    /// back to the plain canvas.
    pub fn with_template(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::new();
        };
        match image::open(path) {
            Ok(template) => {
                tracing::info!(path = %path.display(), "Loaded ticket template");
                Self {
                    template: Some(
                        template
                            .resize_exact(CANVAS_WIDTH, CANVAS_HEIGHT, FilterType::Triangle)
                            .to_rgb8(),
                    ),
                }
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Ticket template unavailable, using plain background"
                );
                Self::new()
            }
        }
    }

    pub fn has_template(&self) -> bool {
        self.template.is_some()
    }

    /// Renders the ticket for `booking` from its snapshots and returns PNG
    /// bytes. Missing display fields are left blank.
    pub fn render(&self, booking: &Booking) -> Result<Vec<u8>, ArtifactError> {
        let payload =
            credential::encode(&booking.credential_code, booking.user_id, booking.event_id);
        let symbol = credential::render_symbol(&payload)?;

        let mut canvas = self
            .template
            .clone()
            .unwrap_or_else(|| RgbImage::from_pixel(CANVAS_WIDTH, CANVAS_HEIGHT, PAPER));

        let event = &booking.event_snapshot;
        let lines = [
            format!("Event: {}", event.name.as_deref().unwrap_or_default()),
            format!("Date: {}", event.date.as_deref().unwrap_or_default()),
            format!(
                "Holder: {}",
                booking.holder_snapshot.full_name.as_deref().unwrap_or_default()
            ),
            format!("Code: {}", booking.credential_code),
        ];
        for (text, top) in lines.iter().zip(TEXT_LINES) {
            draw_text(&mut canvas, TEXT_LEFT, top, text);
        }

        let symbol = DynamicImage::ImageLuma8(symbol).to_rgb8();
        imageops::overlay(&mut canvas, &symbol, SYMBOL_ORIGIN.0, SYMBOL_ORIGIN.1);

        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(canvas).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }
}

fn glyph(c: char) -> [u8; 8] {
    BASIC_FONTS
        .get(c)
        .or_else(|| LATIN_FONTS.get(c))
        .or_else(|| BASIC_FONTS.get('?'))
        .unwrap_or([0; 8])
}

fn draw_text(canvas: &mut RgbImage, left: u32, top: u32, text: &str) {
    let mut x = left;
    for c in text.chars() {
        if x + GLYPH_ADVANCE > TEXT_RIGHT_EDGE {
            break;
        }
        for (row, bits) in glyph(c).iter().enumerate() {
            for col in 0..8u32 {
                if bits & (1 << col) == 0 {
                    continue;
                }
                let px = x + col * GLYPH_SCALE;
                let py = top + row as u32 * GLYPH_SCALE;
                for dy in 0..GLYPH_SCALE {
                    for dx in 0..GLYPH_SCALE {
                        if px + dx < canvas.width() && py + dy < canvas.height() {
                            canvas.put_pixel(px + dx, py + dy, INK);
                        }
                    }
                }
            }
        }
        x += GLYPH_ADVANCE;
    }
}

/// Durable storage for rendered tickets, keyed by credential code.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Stores the image, replacing any earlier render for the same code.
    async fn put(&self, code: &str, bytes: Vec<u8>) -> Result<(), ArtifactError>;

    async fn get(&self, code: &str) -> Result<Option<Vec<u8>>, ArtifactError>;

    /// Returns `true` if an artifact existed.
    async fn remove(&self, code: &str) -> Result<bool, ArtifactError>;
}

/// One `<code>.png` file per ticket under a single directory.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, ArtifactError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn path_for(&self, code: &str) -> Result<PathBuf, ArtifactError> {
        if !credential::is_well_formed_code(code) {
            return Err(ArtifactError::InvalidKey(code.to_string()));
        }
        Ok(self.root.join(format!("{code}.{ARTIFACT_EXTENSION}")))
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn put(&self, code: &str, bytes: Vec<u8>) -> Result<(), ArtifactError> {
        let path = self.path_for(code)?;
        let staging = path.with_extension("tmp");
        tokio::fs::write(&staging, bytes).await?;
        tokio::fs::rename(&staging, &path).await?;
        Ok(())
    }

    async fn get(&self, code: &str) -> Result<Option<Vec<u8>>, ArtifactError> {
        let path = self.path_for(code)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove(&self, code: &str) -> Result<bool, ArtifactError> {
        let path = self.path_for(code)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Artifact store held in memory. Intended for tests and local runs.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.blobs
            .read()
            .map(|blobs| blobs.contains_key(code))
            .unwrap_or(false)
    }

    fn poisoned() -> ArtifactError {
        ArtifactError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "artifact store lock poisoned",
        ))
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn put(&self, code: &str, bytes: Vec<u8>) -> Result<(), ArtifactError> {
        if !credential::is_well_formed_code(code) {
            return Err(ArtifactError::InvalidKey(code.to_string()));
        }
        self.blobs
            .write()
            .map_err(|_| Self::poisoned())?
            .insert(code.to_string(), bytes);
        Ok(())
    }

    async fn get(&self, code: &str) -> Result<Option<Vec<u8>>, ArtifactError> {
        Ok(self.blobs.read().map_err(|_| Self::poisoned())?.get(code).cloned())
    }

    async fn remove(&self, code: &str) -> Result<bool, ArtifactError> {
        Ok(self
            .blobs
            .write()
            .map_err(|_| Self::poisoned())?
            .remove(code)
            .is_some())
    }
}
