use serde::{Deserialize, Serialize};

use crate::{LyricEntry, LyricSet, Tone};

/// Per-song presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub title: Tone,
    /// Printed once the song has ended.
    pub farewell: String,
}

impl Theme {
    pub fn new(title: Tone, farewell: impl Into<String>) -> Self {
        Self {
            title,
            farewell: farewell.into(),
        }
    }
}

/// Everything needed to perform one song.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    pub slug: String,
    pub title: String,
    pub lyrics: LyricSet,
    pub audio_url: Option<String>,
    pub theme: Theme,
}

impl Song {
    pub fn new(slug: impl Into<String>, title: impl Into<String>, lyrics: LyricSet) -> Self {
        Self {
            slug: slug.into(),
            title: title.into(),
            lyrics,
            audio_url: None,
            theme: Theme::new(Tone::Pink, "✨ Song Ended! ✨"),
        }
    }

    pub fn with_audio(mut self, url: impl Into<String>) -> Self {
        self.audio_url = Some(url.into());
        self
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }
}

/// Looks a song up by its 1-based position or by its slug.
pub fn find_song<'a>(songs: &'a [Song], query: &str) -> Option<&'a Song> {
    let query = query.trim();
    if let Ok(position) = query.parse::<usize>() {
        return position.checked_sub(1).and_then(|index| songs.get(index));
    }
    songs
        .iter()
        .find(|song| song.slug.eq_ignore_ascii_case(query))
}

/// The songs shipped with the player, in menu order.
pub fn builtin_songs() -> Vec<Song> {
    vec![
        bergema_sampai_selamanya(),
        lihat_kebunku(),
        ours_to_keep(),
        sampai_akhir_waktu(),
    ]
}

fn bergema_sampai_selamanya() -> Song {
    use LyricEntry::Blank;

    let lyrics = LyricSet::new(vec![
        LyricEntry::timed("Bersandar padaku", 80, 1100),
        LyricEntry::timed("Taruh di bahuku", 80, 2100),
        LyricEntry::timed("Relakan semua", 80, 1250),
        LyricEntry::paced("Bebas semaumu", 80),
        LyricEntry::held("", 700),
        LyricEntry::timed("Percayalah ini sayang terlewatkan", 120, 1700),
        LyricEntry::timed("Kusampaikan dalam nyanyian", 80, 1000),
        LyricEntry::timed("Bergema sampai selamanyaa~~~", 80, 2000),
        LyricEntry::held("", 700),
        LyricEntry::timed("(Nada Music)", 80, 2000),
        LyricEntry::held("", 19000),
        LyricEntry::timed("Dunia pasti ada akhirnyaa", 100, 3000),
        LyricEntry::timed("Bintang-bintang pun ada umurnya", 100, 2600),
        LyricEntry::timed("Maka tenang saja kita disini berdua a a-aa", 100, 4500),
        LyricEntry::timed("Nikmati sementara yang adaaaaaa", 100, 2000),
        Blank,
        LyricEntry::timed("Tak perlu selamanya bersama,", 70, 1300),
        LyricEntry::timed("cukup rasa ini bergema selamanya. 💫", 70, 0),
        Blank,
        LyricEntry::timed("Tengkyu ~Kenichi Ichi", 70, 1500),
    ]);

    Song::new("bergemasampaiselamanya", "Bergema Sampai Selamanya", lyrics)
        .with_audio("http://upload.kendev.my.id/files/1760670061652-cd26cebb5dc71eb4d09786f79f013550.mp3")
        .with_theme(Theme::new(Tone::Cyan, "✨ Lagu selesai! ✨"))
}

fn lihat_kebunku() -> Song {
    use LyricEntry::Blank;

    let lyrics = LyricSet::new(vec![
        LyricEntry::timed("Oh Mengapa", 80, 1300),
        LyricEntry::timed("Bunga di taman hatiku hanya satu", 80, 5300),
        LyricEntry::timed("Oh Menghilang", 80, 2000),
        LyricEntry::paced("Bunga kesayanganku diambil orang", 80),
        LyricEntry::held("", 700),
        LyricEntry::timed("(Nada Music)", 80, 2000),
        LyricEntry::held("", 8000),
        LyricEntry::timed("Mekarlah selamanya di taman yang lain", 100, 2300),
        LyricEntry::timed("Sungguh kelabu", 120, 2700),
        LyricEntry::timed("Kini tamanku tanpamu", 80, 3100),
        LyricEntry::timed("Jangan kau layu", 120, 3700),
        LyricEntry::timed("Semestakan menjagamu", 80, 2000),
        Blank,
        LyricEntry::timed(
            "Melihatmu bahagia dengan yang lain sudah cukup buatku 😉",
            70,
            500,
        ),
        Blank,
        LyricEntry::timed("Sannkyu ~Kenichi Ichi", 70, 1500),
    ]);

    Song::new("lihatkebunku", "Lihat Kebunku (Taman Bunga)", lyrics)
        .with_audio("http://upload.kendev.my.id/files/1760669451298-01ce18cb1babf5ccaa308ca742ba854e.mp3")
        .with_theme(Theme::new(Tone::Magenta, "✨ Lagu selesai! ✨"))
}

fn ours_to_keep() -> Song {
    use LyricEntry::Blank;

    let lyrics = LyricSet::new(vec![
        LyricEntry::timed("Do you ever feel the need to get away from me?", 80, 1500),
        LyricEntry::timed("Do I bore you?", 80, 600),
        LyricEntry::timed("Or do you want to", 100, 600),
        LyricEntry::timed("Take me from this crowded place to", 80, 800),
        LyricEntry::timed("Somewhere we can find some peace?", 70, 700),
        LyricEntry::timed("And the world", 100, 10),
        LyricEntry::held("", 500),
        LyricEntry::timed("Is Ours to Keep", 80, 500),
        LyricEntry::held("", 3000),
        LyricEntry::timed("Kenangan indah itu adalah kisah abadi", 70, 200),
        LyricEntry::timed("Dari sebuah cinta yang telah pergi.", 70, 500),
        Blank,
        LyricEntry::timed("Arigatouuu ~Kenichi Ichi", 70, 0),
    ]);

    Song::new("ourstokeep", "Ours To Keep", lyrics)
        .with_audio("https://upload.kendev.my.id/files/1760666816450-838a47023ca26b56abfb26e4824ed2e1.mp3")
        .with_theme(Theme::new(Tone::Pink, "✨ Song Ended! ✨"))
}

fn sampai_akhir_waktu() -> Song {
    use LyricEntry::Blank;

    let lyrics = LyricSet::new(vec![
        LyricEntry::timed("Yang ku ingin", 80, 1700),
        LyricEntry::timed("Bukan sekedar", 80, 1700),
        LyricEntry::timed("Hanya untuk pacaran", 100, 3200),
        LyricEntry::timed("Yang kumau", 80, 800),
        LyricEntry::timed("Memberikan seluruh cinta", 100, 2100),
        LyricEntry::timed("Sampai akhir waktu, nantiiii ~~~", 100, 2700),
        LyricEntry::held("", 700),
        LyricEntry::timed("(Nada Music)", 80, 2000),
        LyricEntry::held("", 12300),
        LyricEntry::timed("Aku tak main main", 100, 1000),
        LyricEntry::timed("Dengan semuaa inii", 120, 2700),
        LyricEntry::held("", 1000),
        LyricEntry::timed("Oh (aku akan datang lagii) ~~~", 80, 3300),
        LyricEntry::timed("Meski ibumu melarangg, woo", 120, 2500),
        LyricEntry::timed("(Ku tunjukkan kesungguhan)", 80, 2500),
        LyricEntry::timed("Untuk miliki dirimuuu ~~~", 100, 2700),
        Blank,
        LyricEntry::timed("Aku tak ingin banyak hal darimu", 70, 200),
        LyricEntry::timed(
            "Cukup kesempatan untuk mencintaimu tanpa batas waktu.",
            70,
            500,
        ),
        Blank,
        LyricEntry::timed("Arigatouuu ~Kenichi Ichi", 70, 0),
    ]);

    Song::new("sampaiakhirwaktu", "Sampai Akhir Waktu", lyrics)
        .with_audio("http://upload.kendev.my.id/files/1760670459531-089a757dc5cef630ee046adad6dd1a38.mp3")
        .with_theme(Theme::new(Tone::Pink, "✨ Lagu selesai! ✨"))
}
