//! Curated secret-word pool and random draws for the mayor's options.

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{BTreeSet, HashSet};

use crate::types::Difficulty;

pub struct WordList {
    pub category: &'static str,
    pub difficulty: Difficulty,
    pub words: &'static [&'static str],
}

/// Number of candidates offered to the mayor during Night
pub const WORD_OPTION_COUNT: usize = 5;

pub static BUILTIN_LISTS: &[WordList] = &[
    WordList {
        category: "animals",
        difficulty: Difficulty::Easy,
        words: &[
            "dog", "cat", "bird", "fish", "horse", "cow", "pig", "chicken", "duck", "rabbit",
            "mouse", "elephant", "lion", "tiger", "bear", "monkey", "snake", "frog", "turtle",
            "butterfly", "bee", "ant", "spider", "dolphin", "whale", "shark", "penguin", "owl",
            "eagle",
        ],
    },
    WordList {
        category: "food",
        difficulty: Difficulty::Easy,
        words: &[
            "pizza", "burger", "apple", "banana", "orange", "bread", "cheese", "milk", "egg",
            "rice", "pasta", "chicken", "fish", "cake", "cookie", "ice cream", "chocolate",
            "candy", "soup", "salad", "sandwich", "hot dog", "french fries", "popcorn",
            "watermelon", "strawberry",
        ],
    },
    WordList {
        category: "household",
        difficulty: Difficulty::Easy,
        words: &[
            "chair", "table", "bed", "door", "window", "lamp", "clock", "phone", "television",
            "computer", "book", "pen", "cup", "plate", "spoon", "fork", "knife", "towel",
            "pillow", "blanket", "mirror", "soap", "toothbrush", "key", "shoe", "hat", "bag",
            "umbrella", "camera",
        ],
    },
    WordList {
        category: "nature",
        difficulty: Difficulty::Easy,
        words: &[
            "sun", "moon", "star", "cloud", "rain", "snow", "tree", "flower", "grass",
            "mountain", "river", "ocean", "beach", "forest", "sky", "rainbow", "fire", "water",
            "rock", "sand", "leaf", "wind",
        ],
    },
    WordList {
        category: "animals",
        difficulty: Difficulty::Medium,
        words: &[
            "giraffe", "zebra", "kangaroo", "koala", "panda", "gorilla", "cheetah", "leopard",
            "rhino", "hippo", "crocodile", "alligator", "octopus", "jellyfish", "seahorse",
            "lobster", "crab", "peacock", "flamingo", "parrot", "vulture", "bat", "hedgehog",
            "squirrel", "beaver", "otter", "seal", "walrus", "moose", "deer", "wolf",
        ],
    },
    WordList {
        category: "food",
        difficulty: Difficulty::Medium,
        words: &[
            "spaghetti", "lasagna", "burrito", "taco", "sushi", "ramen", "pancake", "waffle",
            "donut", "muffin", "croissant", "bagel", "pretzel", "nachos", "quesadilla",
            "hummus", "guacamole", "yogurt", "oatmeal", "cereal", "bacon", "sausage", "steak",
            "lobster", "shrimp", "avocado", "broccoli", "cauliflower", "asparagus",
        ],
    },
    WordList {
        category: "places",
        difficulty: Difficulty::Medium,
        words: &[
            "hospital", "airport", "museum", "library", "stadium", "theater", "restaurant",
            "hotel", "castle", "palace", "temple", "church", "mosque", "pyramid", "lighthouse",
            "windmill", "bridge", "tunnel", "fountain", "statue", "park", "zoo", "aquarium",
            "carnival", "circus", "mall", "supermarket", "bakery", "pharmacy", "gym",
        ],
    },
    WordList {
        category: "occupations",
        difficulty: Difficulty::Medium,
        words: &[
            "doctor", "nurse", "teacher", "engineer", "lawyer", "chef", "pilot", "astronaut",
            "firefighter", "police", "detective", "scientist", "artist", "musician", "actor",
            "photographer", "journalist", "architect", "dentist", "veterinarian", "plumber",
            "electrician", "carpenter", "farmer", "fisherman", "mechanic",
        ],
    },
    WordList {
        category: "sports",
        difficulty: Difficulty::Medium,
        words: &[
            "basketball", "football", "soccer", "baseball", "tennis", "golf", "hockey",
            "volleyball", "swimming", "boxing", "wrestling", "karate", "gymnastics", "skating",
            "skiing", "snowboarding", "surfing", "cycling", "marathon", "archery", "fencing",
            "bowling", "cricket",
        ],
    },
    WordList {
        category: "concepts",
        difficulty: Difficulty::Hard,
        words: &[
            "democracy", "freedom", "justice", "equality", "harmony", "wisdom", "courage",
            "patience", "gratitude", "empathy", "ambition", "destiny", "nostalgia", "serenity",
            "chaos", "paradox", "illusion", "intuition", "conscience", "imagination",
            "inspiration", "perseverance",
        ],
    },
    WordList {
        category: "science",
        difficulty: Difficulty::Hard,
        words: &[
            "photosynthesis", "evolution", "gravity", "magnetism", "electricity", "radiation",
            "chromosome", "molecule", "atom", "neutron", "proton", "electron", "velocity",
            "acceleration", "friction", "momentum", "wavelength", "frequency", "amplitude",
            "ecosystem", "organism",
        ],
    },
    WordList {
        category: "mythology",
        difficulty: Difficulty::Hard,
        words: &[
            "unicorn", "dragon", "phoenix", "mermaid", "centaur", "griffin", "pegasus",
            "minotaur", "cyclops", "sphinx", "kraken", "hydra", "werewolf", "vampire", "zombie",
            "ghost", "goblin", "troll", "ogre", "fairy", "elf", "dwarf", "wizard", "witch",
            "sorcerer",
        ],
    },
    WordList {
        category: "technology",
        difficulty: Difficulty::Hard,
        words: &[
            "algorithm", "database", "encryption", "bandwidth", "firewall", "malware",
            "cryptocurrency", "blockchain", "virtual reality", "artificial intelligence",
            "machine learning", "quantum computer", "hologram", "nanotechnology",
            "biotechnology", "robotics",
        ],
    },
    WordList {
        category: "history",
        difficulty: Difficulty::Hard,
        words: &[
            "renaissance", "revolution", "colonization", "industrialization", "monarchy",
            "empire", "dynasty", "civilization", "archaeology", "artifact", "hieroglyphics",
            "gladiator", "samurai", "viking", "crusade", "plague", "medieval", "prehistoric",
            "ancient",
        ],
    },
    WordList {
        category: "general",
        difficulty: Difficulty::Easy,
        words: &[
            "birthday", "party", "gift", "balloon", "candle", "music", "dance", "game", "toy",
            "friend", "family", "love", "happy", "smile", "laugh", "sleep", "dream", "morning",
            "night", "day", "week", "month", "year",
        ],
    },
    WordList {
        category: "general",
        difficulty: Difficulty::Medium,
        words: &[
            "adventure", "mystery", "treasure", "secret", "journey", "discovery", "challenge",
            "victory", "celebration", "tradition", "memory", "experience", "opportunity",
            "achievement", "competition", "teamwork", "creativity", "innovation",
            "communication", "relationship",
        ],
    },
    WordList {
        category: "general",
        difficulty: Difficulty::Hard,
        words: &[
            "philosophy", "psychology", "sociology", "anthropology", "metaphor", "hypothesis",
            "phenomenon", "perspective", "consciousness", "existence", "authenticity",
            "vulnerability", "resilience", "sustainability", "globalization", "bureaucracy",
            "infrastructure", "entrepreneur",
        ],
    },
];

/// Draws candidate secret words from a static pool.
#[derive(Clone, Copy)]
pub struct WordSelector {
    lists: &'static [WordList],
}

impl Default for WordSelector {
    fn default() -> Self {
        Self::new(BUILTIN_LISTS)
    }
}

impl WordSelector {
    pub fn new(lists: &'static [WordList]) -> Self {
        Self { lists }
    }

    /// All categories present in the pool, sorted
    pub fn categories(&self) -> BTreeSet<&'static str> {
        self.lists.iter().map(|list| list.category).collect()
    }

    /// Distinct words matching the filters, in pool order
    fn pool(&self, filter: Option<(&str, Difficulty)>) -> Vec<&'static str> {
        let mut seen = HashSet::new();
        self.lists
            .iter()
            .filter(|list| match filter {
                Some((category, difficulty)) => {
                    list.category == category && list.difficulty == difficulty
                }
                None => true,
            })
            .flat_map(|list| list.words.iter().copied())
            .filter(|word| seen.insert(*word))
            .collect()
    }

    /// Draw `count` distinct words in random order.
    ///
    /// When the category/difficulty pair has fewer than `count` words the whole
    /// pool is used instead.
    pub fn draw<R: Rng + ?Sized>(
        &self,
        count: usize,
        category: &str,
        difficulty: Difficulty,
        rng: &mut R,
    ) -> Vec<String> {
        let mut pool = self.pool(Some((category, difficulty)));
        if pool.len() < count {
            tracing::debug!(
                category,
                ?difficulty,
                available = pool.len(),
                "Word pool too small, falling back to all words"
            );
            pool = self.pool(None);
        }

        pool.shuffle(rng);
        pool.into_iter()
            .take(count)
            .map(str::to_string)
            .collect()
    }
}
