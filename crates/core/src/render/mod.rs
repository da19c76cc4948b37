use std::{fmt, io::Write, path::Path};

use crossterm::{
    cursor::MoveTo,
    queue,
    style::{style, Color, Stylize},
    terminal::{Clear, ClearType},
};
use figlet_rs::FIGfont;
use serde::{Deserialize, Serialize};

use crate::{CodesongError, DisplayConfig, LyricSink, Result};

/// Width of the `♪` rule printed under the title.
pub const SEPARATOR_WIDTH: usize = 50;

/// Install locations of FIGlet's `small` font, which song titles use when it
/// is available.
pub const SMALL_FONT_PATHS: [&str; 3] = [
    "/usr/share/figlet/small.flf",
    "/usr/local/share/figlet/small.flf",
    "/opt/homebrew/share/figlet/fonts/small.flf",
];

/// Named colours of the fixed palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Pink,
    Cyan,
    Magenta,
    Yellow,
    Green,
    Red,
    Blue,
    Gray,
    White,
}

impl Tone {
    pub fn color(self) -> Color {
        match self {
            Self::Pink => Color::AnsiValue(213),
            Self::Cyan => Color::Cyan,
            Self::Magenta => Color::Magenta,
            Self::Yellow => Color::Yellow,
            Self::Green => Color::Green,
            Self::Red => Color::Red,
            Self::Blue => Color::Blue,
            Self::Gray => Color::Grey,
            Self::White => Color::White,
        }
    }
}

/// Wraps text in start/reset colour escapes, or leaves it alone when colour
/// is disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    enabled: bool,
}

impl Palette {
    pub fn colored() -> Self {
        Self { enabled: true }
    }

    pub fn plain() -> Self {
        Self { enabled: false }
    }

    pub fn paint(&self, tone: Tone, text: &str) -> String {
        if self.enabled {
            style(text).with(tone.color()).to_string()
        } else {
            text.to_string()
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::colored()
    }
}

/// FIGlet renderer for song titles.
pub struct Banner {
    font: FIGfont,
}

impl Banner {
    pub fn standard() -> Result<Self> {
        let font = FIGfont::standard().map_err(CodesongError::Banner)?;
        Ok(Self { font })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let path = path
            .to_str()
            .ok_or(CodesongError::InvalidInput("banner font path is not valid UTF-8"))?;
        let font = FIGfont::from_file(path).map_err(CodesongError::Banner)?;
        Ok(Self { font })
    }

    /// Title font: the configured file, else an installed `small` font, else
    /// the built-in standard font.
    pub fn from_config(config: &DisplayConfig) -> Result<Self> {
        match &config.banner_font {
            Some(path) => Self::from_file(path),
            None => Self::first_available(&SMALL_FONT_PATHS),
        }
    }

    /// Loads the first readable font among `candidates`, falling back to the
    /// standard font.
    pub fn first_available<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        for path in candidates.iter().map(AsRef::as_ref) {
            if !path.is_file() {
                continue;
            }
            match Self::from_file(path) {
                Ok(banner) => {
                    tracing::debug!(?path, "using title font");
                    return Ok(banner);
                }
                Err(err) => tracing::warn!(?path, error = %err, "skipping unreadable font"),
            }
        }
        Self::standard()
    }

    pub fn render(&self, text: &str) -> Result<String> {
        self.font
            .convert(text)
            .map(|figure| figure.to_string())
            .ok_or_else(|| CodesongError::Banner(format!("cannot render `{text}`")))
    }
}

impl fmt::Debug for Banner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Banner").finish()
    }
}

/// Everything the player draws besides the typed lyrics.
pub trait DisplaySurface: LyricSink {
    fn clear(&mut self) -> Result<()>;
    fn title(&mut self, title: &str, tone: Tone) -> Result<()>;
    fn separator(&mut self) -> Result<()>;
    fn status(&mut self, tone: Tone, message: &str) -> Result<()>;
}

/// Terminal output: banner, status lines and the typed lyrics.
#[derive(Debug)]
pub struct Terminal<W: Write> {
    out: W,
    palette: Palette,
    banner: Banner,
    prefix: String,
    clear_screen: bool,
}

impl Terminal<std::io::Stdout> {
    pub fn stdout(config: &DisplayConfig) -> Result<Self> {
        Ok(Self::new(
            std::io::stdout(),
            Palette::colored(),
            Banner::from_config(config)?,
            config,
        ))
    }
}

impl<W: Write> Terminal<W> {
    pub fn new(out: W, palette: Palette, banner: Banner, config: &DisplayConfig) -> Self {
        Self {
            out,
            palette,
            banner,
            prefix: config.prefix.clone(),
            clear_screen: config.clear_screen,
        }
    }

    pub fn palette(&self) -> Palette {
        self.palette
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: &str) -> Result<()> {
        writeln!(self.out, "{text}")?;
        self.out.flush()?;
        Ok(())
    }
}

impl<W: Write> LyricSink for Terminal<W> {
    fn begin_line(&mut self) -> Result<()> {
        write!(self.out, "{}", self.prefix)?;
        self.out.flush()?;
        Ok(())
    }

    fn emit(&mut self, ch: char) -> Result<()> {
        write!(self.out, "{ch}")?;
        self.out.flush()?;
        Ok(())
    }

    fn end_line(&mut self) -> Result<()> {
        self.line("")
    }
}

impl<W: Write> DisplaySurface for Terminal<W> {
    fn clear(&mut self) -> Result<()> {
        if self.clear_screen {
            queue!(self.out, Clear(ClearType::All), MoveTo(0, 0))?;
            self.out.flush()?;
        }
        Ok(())
    }

    fn title(&mut self, title: &str, tone: Tone) -> Result<()> {
        let art = match self.banner.render(title) {
            Ok(art) => art,
            Err(err) => {
                tracing::warn!(title, error = %err, "falling back to plain title");
                format!("{title}\n")
            }
        };
        let painted = self.palette.paint(tone, art.trim_end_matches('\n'));
        self.line(&format!("\n{painted}"))
    }

    fn separator(&mut self) -> Result<()> {
        let rule = "♪".repeat(SEPARATOR_WIDTH);
        let painted = self.palette.paint(Tone::Yellow, &rule);
        self.line(&format!("{painted}\n"))
    }

    fn status(&mut self, tone: Tone, message: &str) -> Result<()> {
        let painted = self.palette.paint(tone, message);
        self.line(&painted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain_terminal() -> Terminal<Vec<u8>> {
        let config = DisplayConfig {
            clear_screen: false,
            ..Default::default()
        };
        Terminal::new(
            Vec::new(),
            Palette::plain(),
            Banner::standard().unwrap(),
            &config,
        )
    }

    fn output(terminal: Terminal<Vec<u8>>) -> String {
        String::from_utf8(terminal.into_inner()).unwrap()
    }

    #[test]
    fn plain_palette_leaves_text_alone() {
        let painted = Palette::colored().paint(Tone::Green, "done");
        assert!(painted.contains("done"));
        assert_eq!(Palette::plain().paint(Tone::Green, "done"), "done");
    }

    #[test]
    fn renders_multiline_banner() {
        let art = Banner::standard().unwrap().render("Hi").unwrap();
        assert!(art.lines().count() > 1);
    }

    #[test]
    fn types_lines_with_prefix() {
        let mut terminal = plain_terminal();
        terminal.begin_line().unwrap();
        for ch in "la la".chars() {
            terminal.emit(ch).unwrap();
        }
        terminal.end_line().unwrap();

        assert_eq!(output(terminal), "🎵 la la\n");
    }

    #[test]
    fn separator_is_fifty_notes() {
        let mut terminal = plain_terminal();
        terminal.separator().unwrap();

        let out = output(terminal);
        assert_eq!(out.trim_end().chars().filter(|c| *c == '♪').count(), 50);
    }

    #[test]
    fn missing_font_is_a_banner_error() {
        let err = Banner::from_file(Path::new("/nonexistent/small.flf")).unwrap_err();
        assert_eq!(err.stage(), "banner");
    }

    #[test]
    fn unusable_fonts_fall_back_to_standard() {
        let broken = std::env::temp_dir()
            .join(format!("codesong-broken-{}.flf", std::process::id()));
        std::fs::write(&broken, "garbage").unwrap();
        let candidates = [Path::new("/nonexistent/small.flf"), broken.as_path()];

        let banner = Banner::first_available(&candidates).unwrap();
        let standard = Banner::standard().unwrap();
        std::fs::remove_file(&broken).unwrap();

        assert_eq!(banner.render("Hi").unwrap(), standard.render("Hi").unwrap());
    }

    #[test]
    fn configured_font_takes_precedence() {
        let config = DisplayConfig {
            banner_font: Some("/nonexistent/custom.flf".into()),
            ..Default::default()
        };
        assert_eq!(Banner::from_config(&config).unwrap_err().stage(), "banner");
    }
}
