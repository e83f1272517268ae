use crate::config::RenderConfig;
use crate::error::RenderError;
use crate::measure::{MEASURE_CHAIN, MeasureStrategy, TextMeasure, measure_with_chain};
use crate::types::FontFace;
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::Path;
use std::sync::Mutex;

pub const TEXT_FONT_SIZE: f32 = 30.0;
pub const EMOJI_FONT_SIZE: f32 = 30.0;

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct TextWidthKey {
    face: FontFace,
    text: String,
}

#[derive(Debug)]
struct TextWidthCache {
    map: HashMap<TextWidthKey, i32>,
    order: VecDeque<TextWidthKey>,
    max_entries: usize,
}

impl TextWidthCache {
    fn new(max_entries: usize) -> Self {
        Self {
            map: HashMap::new(),
            order: VecDeque::new(),
            max_entries,
        }
    }

    fn get(&self, key: &TextWidthKey) -> Option<i32> {
        self.map.get(key).copied()
    }

    fn insert(&mut self, key: TextWidthKey, value: i32) {
        if self.map.contains_key(&key) {
            return;
        }
        self.map.insert(key.clone(), value);
        self.order.push_back(key);
        while self.map.len() > self.max_entries {
            if let Some(old) = self.order.pop_front() {
                self.map.remove(&old);
            } else {
                break;
            }
        }
    }
}

#[derive(Debug)]
pub(crate) struct RegisteredFont {
    pub(crate) name: String,
    pub(crate) data: Vec<u8>,
    pub(crate) size: f32,
    pub(crate) ascender: f32,
}

impl RegisteredFont {
    fn parse(data: Vec<u8>, source: &str, size: f32) -> Result<Self, RenderError> {
        let face = ttf_parser::Face::parse(&data, 0)
            .map_err(|e| RenderError::InvalidFont(format!("{source}: {e}")))?;
        let scale = size / face.units_per_em().max(1) as f32;
        let ascender = face.ascender() as f32 * scale;
        Ok(Self {
            name: source.to_string(),
            data,
            size,
            ascender,
        })
    }
}

// Read-only after construction; the width cache is the only interior state.
#[derive(Debug)]
pub struct FontRegistry {
    regular: RegisteredFont,
    bold: RegisteredFont,
    emoji: RegisteredFont,
    chain: Vec<MeasureStrategy>,
    text_width_cache: Mutex<TextWidthCache>,
}

impl FontRegistry {
    pub fn load(config: &RenderConfig) -> Result<Self, RenderError> {
        let base = config.resource_dir.as_path();
        let emoji_path = base.join(&config.emoji_font);
        if !emoji_path.exists() {
            return Err(RenderError::MissingFont(emoji_path));
        }
        let regular_path = base.join(&config.normal_font);
        if !regular_path.exists() {
            return Err(RenderError::MissingFont(regular_path));
        }
        let bold_path = base.join(&config.bold_font);
        if !bold_path.exists() {
            return Err(RenderError::MissingFont(bold_path));
        }
        let regular = read_font(&regular_path)?;
        let bold = read_font(&bold_path)?;
        let emoji = read_font(&emoji_path)?;
        tracing::debug!(
            regular = %regular_path.display(),
            bold = %bold_path.display(),
            emoji = %emoji_path.display(),
            "fonts loaded"
        );
        Self::from_bytes(regular, bold, emoji)
    }

    pub fn from_bytes(
        regular: Vec<u8>,
        bold: Vec<u8>,
        emoji: Vec<u8>,
    ) -> Result<Self, RenderError> {
        Ok(Self {
            regular: RegisteredFont::parse(regular, "regular", TEXT_FONT_SIZE)?,
            bold: RegisteredFont::parse(bold, "bold", TEXT_FONT_SIZE)?,
            emoji: RegisteredFont::parse(emoji, "emoji", EMOJI_FONT_SIZE)?,
            chain: MEASURE_CHAIN.to_vec(),
            text_width_cache: Mutex::new(TextWidthCache::new(20_000)),
        })
    }

    // Restricts the measurement chain, e.g. to skip shaping on constrained hosts.
    // CharCount is always appended so measurement still terminates.
    pub fn with_measure_chain(mut self, chain: &[MeasureStrategy]) -> Self {
        let mut chain = chain.to_vec();
        if !chain.contains(&MeasureStrategy::CharCount) {
            chain.push(MeasureStrategy::CharCount);
        }
        self.chain = chain;
        self.text_width_cache = Mutex::new(TextWidthCache::new(20_000));
        self
    }

    pub(crate) fn resolve(&self, face: FontFace) -> &RegisteredFont {
        match face {
            FontFace::Regular => &self.regular,
            FontFace::Bold => &self.bold,
            FontFace::Emoji => &self.emoji,
        }
    }

    pub fn text_font_size(&self) -> i32 {
        self.regular.size as i32
    }
}

impl TextMeasure for FontRegistry {
    fn measure(&self, text: &str, face: FontFace) -> i32 {
        if text.is_empty() {
            return 0;
        }
        let key = TextWidthKey {
            face,
            text: text.to_string(),
        };
        if let Ok(cache) = self.text_width_cache.lock() {
            if let Some(value) = cache.get(&key) {
                return value;
            }
        }
        let font = self.resolve(face);
        let (width, strategy) = measure_with_chain(&self.chain, &font.data, text, font.size);
        if strategy != self.chain[0] {
            tracing::debug!(font = %font.name, ?strategy, "text measurement degraded");
        }
        if let Ok(mut cache) = self.text_width_cache.lock() {
            cache.insert(key, width);
        }
        width
    }
}

fn read_font(path: &Path) -> Result<Vec<u8>, RenderError> {
    fs::read(path).map_err(|_| RenderError::MissingFont(path.to_path_buf()))
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::path::PathBuf;

    const CANDIDATES: &[&str] = &[
        "DejaVuSans.ttf",
        "LiberationSans-Regular.ttf",
        "NotoSans-Regular.ttf",
        "Arial.ttf",
        "arial.ttf",
    ];

    fn font_dirs() -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        if let Ok(extra) = std::env::var("GIFTBOARD_FONT_DIR") {
            dirs.extend(std::env::split_paths(&extra));
        }
        dirs.push(PathBuf::from("resource"));
        dirs.push(PathBuf::from("/usr/share/fonts"));
        dirs.push(PathBuf::from("/usr/local/share/fonts"));
        dirs.push(PathBuf::from("/System/Library/Fonts"));
        dirs.push(PathBuf::from("/Library/Fonts"));
        dirs.push(PathBuf::from(r"C:\Windows\Fonts"));
        dirs
    }

    fn find_in(dir: &Path, depth: usize) -> Option<Vec<u8>> {
        for name in CANDIDATES {
            if let Ok(bytes) = fs::read(dir.join(name)) {
                if ttf_parser::Face::parse(&bytes, 0).is_ok() {
                    return Some(bytes);
                }
            }
        }
        if depth == 0 {
            return None;
        }
        let entries = fs::read_dir(dir).ok()?;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                if let Some(bytes) = find_in(&path, depth - 1) {
                    return Some(bytes);
                }
            }
        }
        None
    }

    // A registry backed by whatever sans font the host has; None when the
    // host has no fonts, in which case font-dependent tests return early.
    pub(crate) fn system_registry() -> Option<FontRegistry> {
        let bytes = font_dirs().iter().find_map(|dir| find_in(dir, 3))?;
        FontRegistry::from_bytes(bytes.clone(), bytes.clone(), bytes).ok()
    }
}
