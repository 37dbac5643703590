//! Music Categories
//!
//! The fixed set of music flows the analyzer may recommend.

/// A music flow category with its BPM range and description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MusicCategory {
    pub name: &'static str,
    pub bpm_range: &'static str,
    pub description: &'static str,
}

/// All categories the model is allowed to pick from
pub const MUSIC_CATEGORIES: [MusicCategory; 6] = [
    MusicCategory {
        name: "Running",
        bpm_range: "120-140",
        description: "Musica motivazionale per attività sportiva",
    },
    MusicCategory {
        name: "Kitchen",
        bpm_range: "80-100",
        description: "Ritmi allegri per cucinare e socializzare",
    },
    MusicCategory {
        name: "Ambient",
        bpm_range: "60-80",
        description: "Soundscape atmosferici e texture elettroniche",
    },
    MusicCategory {
        name: "Relaxing",
        bpm_range: "50-70",
        description: "Melodie calmanti per meditazione e rilassamento",
    },
    MusicCategory {
        name: "Working",
        bpm_range: "90-110",
        description: "Musica strumentale per concentrazione",
    },
    MusicCategory {
        name: "Walking",
        bpm_range: "100-120",
        description: "Ritmi naturali e brani cantautorali",
    },
];

/// Look up a category by name, case-insensitively
pub fn find_category(name: &str) -> Option<&'static MusicCategory> {
    MUSIC_CATEGORIES
        .iter()
        .find(|c| c.name.eq_ignore_ascii_case(name.trim()))
}

/// Format the category list for the analysis prompt:
/// `Name: (lo-hi BPM) description` per line
pub fn format_categories() -> String {
    MUSIC_CATEGORIES
        .iter()
        .map(|c| format!("{}: ({} BPM) {}", c.name, c.bpm_range, c.description))
        .collect::<Vec<_>>()
        .join("\n")
}
