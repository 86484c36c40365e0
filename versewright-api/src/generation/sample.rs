//! Deterministic sample generator
//!
//! Stands in for the live backend during development and in tests. Output is
//! a pure function of the instruction: exact-count requests get numbered
//! lines that follow the rhyme pattern, everything else gets a canned poem
//! for the form with the theme spliced in.

use async_trait::async_trait;
use versewright_common::forms::PoemType;
use versewright_common::prompt::GenerationInstruction;
use versewright_common::Result;

use super::PoemGenerator;

/// End words by rhyme group, cycled by line index
///
/// Groups cover pattern letters A through F; later letters wrap around.
const RHYME_WORDS: [[&str; 10]; 6] = [
    ["day", "way", "say", "play", "stay", "bay", "ray", "pray", "clay", "sway"],
    ["night", "light", "bright", "sight", "might", "flight", "right", "height", "tight", "delight"],
    ["dream", "gleam", "stream", "beam", "theme", "scheme", "cream", "team", "seam", "supreme"],
    ["soul", "goal", "whole", "toll", "role", "bowl", "scroll", "stroll", "foal", "console"],
    ["mind", "find", "kind", "blind", "lined", "signed", "bind", "wind", "designed", "refined"],
    ["heart", "start", "part", "art", "chart", "smart", "cart", "dart", "impart", "depart"],
];

/// Generator that needs no network or credentials
#[derive(Debug, Default)]
pub struct SampleGenerator;

impl SampleGenerator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PoemGenerator for SampleGenerator {
    fn backend_id(&self) -> &'static str {
        "sample"
    }

    async fn generate(&self, instruction: &GenerationInstruction) -> Result<String> {
        let poem = match instruction.line_count {
            Some(count) => exact_count_poem(instruction, count),
            None => sample_poem(instruction.poem_type, &instruction.theme),
        };
        Ok(poem)
    }
}

/// Build a poem with exactly `count` lines
///
/// When a rhyme pattern is present each line ends with a word from that
/// line's rhyme group, so the output demonstrably follows the pattern.
fn exact_count_poem(instruction: &GenerationInstruction, count: u32) -> String {
    let theme = &instruction.theme;
    let lines: Vec<String> = match &instruction.rhyme_pattern {
        Some(pattern) if !pattern.is_empty() => {
            let letters: Vec<char> = pattern.chars().collect();
            (0..count as usize)
                .map(|i| {
                    let word = rhyme_word(letters[i % letters.len()], i);
                    format!("Line {}: {} - ending with {}", i + 1, theme, word)
                })
                .collect()
        }
        _ => (0..count as usize)
            .map(|i| format!("Line {}: {} - free verse line", i + 1, theme))
            .collect(),
    };
    lines.join("\n")
}

fn rhyme_word(letter: char, line_index: usize) -> &'static str {
    let group = (letter.to_ascii_uppercase() as u8).saturating_sub(b'A') as usize;
    RHYME_WORDS[group % RHYME_WORDS.len()][line_index % 10]
}

/// Canned sample for a form with no requested line count
fn sample_poem(poem_type: PoemType, theme: &str) -> String {
    match poem_type {
        PoemType::FreeVerse => format!(
            "In the garden of thoughts where {theme} blooms,\n\
             Words dance like petals in the wind,\n\
             Each line a breath, each stanza a dream,\n\
             Painting pictures only hearts can see.\n\
             \n\
             The rhythm flows like water over stones,\n\
             Smooth and gentle, yet powerful and deep,\n\
             Carrying whispers of ancient stories,\n\
             In verses that speak to the soul."
        ),
        PoemType::Sonnet => format!(
            "When {theme} fills the morning air,\n\
             And sunlight dances through the leaves above,\n\
             The world awakens to a beauty rare,\n\
             A testament to nature's endless love.\n\
             \n\
             Each moment holds a treasure to behold,\n\
             In simple things that often go unseen,\n\
             The stories that through generations told,\n\
             Of life's eternal, ever-changing scene.\n\
             \n\
             So let us pause and breathe the sweet perfume,\n\
             Of {theme} that surrounds us here,\n\
             And find in every flower's gentle bloom,\n\
             A reason to hold all of life more dear.\n\
             \n\
             For in these moments, fleeting though they are,\n\
             We glimpse the beauty of our guiding star."
        ),
        PoemType::Haiku => format!(
            "{theme} whispers soft,\n\
             Morning dew on petals bright,\n\
             Peace in simple things."
        ),
        PoemType::Limerick => format!(
            "There once was a {theme} so bright,\n\
             That filled every heart with delight,\n\
             It danced through the day,\n\
             In its own special way,\n\
             And made everything feel just right."
        ),
        PoemType::Couplet => format!(
            "In {theme} we find our grace,\n\
             A gentle smile upon love's face."
        ),
        PoemType::Ode => format!(
            "O {theme}, magnificent and bright,\n\
             You fill our world with endless light!\n\
             In every moment, every day,\n\
             You show us beauty's perfect way.\n\
             \n\
             Through seasons changing, time's sweet flow,\n\
             You help our weary spirits grow.\n\
             With majesty that knows no end,\n\
             You are our guide, our truest friend.\n\
             \n\
             Let poets sing your praise in verse,\n\
             Let hearts with gratitude rehearse\n\
             The wonder that you bring to all,\n\
             In spring's renewal, autumn's call.\n\
             \n\
             Forever may your essence shine,\n\
             O {theme}, forever thine!"
        ),
        PoemType::Ballad => format!(
            "Oh, tell me the tale of {theme},\n\
             That dances in moonlight so fair,\n\
             With stories of old and of new,\n\
             And magic that floats in the air.\n\
             \n\
             The wind carries whispers of wonder,\n\
             Through valleys and over the hill,\n\
             Where {theme} waits in the silence,\n\
             And time itself seems to stand still."
        ),
        PoemType::Cinquain => format!(
            "{theme}\n\
             Beautiful, serene\n\
             Dancing, flowing, singing\n\
             Bringing joy to all who see\n\
             Wonder."
        ),
        PoemType::Villanelle => format!(
            "The {theme} returns with each new day,\n\
             Through seasons of change and of rest,\n\
             In patterns that never decay.\n\
             \n\
             Though time may seem to slip away,\n\
             The {theme} remains our guest,\n\
             The {theme} returns with each new day.\n\
             \n\
             In moments when we pause to pray,\n\
             We find the {theme} at its best,\n\
             In patterns that never decay.\n\
             \n\
             The {theme} shows us how to play,\n\
             And puts our weary hearts to test,\n\
             The {theme} returns with each new day.\n\
             \n\
             So let us not forget the way\n\
             The {theme} makes us blessed,\n\
             In patterns that never decay.\n\
             The {theme} returns with each new day."
        ),
        PoemType::Acrostic => acrostic_poem(theme),
    }
}

/// One line per letter of the theme's first word, capped at eight
fn acrostic_poem(theme: &str) -> String {
    let word = theme.split_whitespace().next().unwrap_or("");
    word.chars()
        .take(8)
        .map(|c| {
            let letter = c.to_ascii_uppercase();
            match acrostic_line(letter) {
                Some(line) => line.to_string(),
                None => format!("{letter}onders never cease to amaze"),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn acrostic_line(letter: char) -> Option<&'static str> {
    Some(match letter {
        'A' => "Amazing wonders fill the air",
        'B' => "Beautiful moments everywhere",
        'C' => "Cascading light through morning dew",
        'D' => "Dancing shadows, ever new",
        'E' => "Endless stories to be told",
        'F' => "Flowing gently, brave and bold",
        'G' => "Graceful movements in the breeze",
        'H' => "Harmonious melodies with ease",
        'I' => "Inspiring hearts with gentle care",
        'J' => "Joyful laughter fills the air",
        'K' => "Kindness blooms in every space",
        'L' => "Love surrounds this sacred place",
        'M' => "Magical moments come to life",
        'N' => "Nature heals all pain and strife",
        'O' => "Overflowing with pure delight",
        'P' => "Peaceful visions, clear and bright",
        'Q' => "Quietly whispering ancient lore",
        'R' => "Radiant beauty to explore",
        'S' => "Serenity flows like a stream",
        'T' => "Timeless wonder, like a dream",
        'U' => "Unfolding mysteries divine",
        'V' => "Vibrant colors intertwine",
        'W' => "Whispers of the wind so free",
        'X' => "eXtraordinary things we see",
        'Y' => "Yearning hearts find peace at last",
        'Z' => "Zestful joy that is unsurpassed",
        _ => return None,
    })
}
