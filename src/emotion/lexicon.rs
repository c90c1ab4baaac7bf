//! Indonesian emotion keyword lists.
//!
//! Keywords are lowercase. Table order doubles as the tie-break order when two
//! matches score the same.

use super::Emotion;

pub const LEXICON: &[(Emotion, &[&str])] = &[
    (
        Emotion::Sedih,
        &[
            "sedih",
            "menangis",
            "nangis",
            "kecewa",
            "terluka",
            "sakit hati",
            "hancur",
            "pilu",
            "duka",
            "kehilangan",
        ],
    ),
    (
        Emotion::Marah,
        &[
            "marah", "kesal", "benci", "geram", "jengkel", "muak", "emosi", "dendam",
        ],
    ),
    (
        Emotion::Takut,
        &[
            "takut",
            "cemas",
            "khawatir",
            "ngeri",
            "panik",
            "trauma",
            "gemetar",
            "terancam",
            "was-was",
        ],
    ),
    (
        Emotion::PutusAsa,
        &[
            "putus asa",
            "menyerah",
            "tidak berdaya",
            "tak berdaya",
            "sia-sia",
            "tidak ada harapan",
            "ingin mati",
            "lelah hidup",
        ],
    ),
    (
        Emotion::Malu,
        &["malu", "aib", "hina", "rendah diri", "bersalah", "memalukan"],
    ),
    (
        Emotion::Bingung,
        &[
            "bingung",
            "tidak tahu",
            "tidak mengerti",
            "tidak paham",
            "ragu",
            "linglung",
        ],
    ),
    (
        Emotion::Lega,
        &["lega", "tenang", "aman", "plong", "bersyukur"],
    ),
    (
        Emotion::Berharap,
        &["berharap", "harapan", "semoga", "ingin sembuh", "percaya", "optimis"],
    ),
];

/// Keywords of a single emotion
pub fn keywords(emotion: Emotion) -> &'static [&'static str] {
    LEXICON
        .iter()
        .find(|(e, _)| *e == emotion)
        .map(|(_, words)| *words)
        .unwrap_or(&[])
}
