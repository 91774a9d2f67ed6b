//! 🎲 Transforms — one reference id in, one toy enhancement out.
//!
//! 🎬 COLD OPEN — INT. TOY BOX — NIGHT
//!
//! A reference id arrives. It has no idea what's about to happen. The generator reaches
//! into the box, pulls out a toy, rolls a d101 for the score, and staples both onto the
//! reference. Nobody asked why. Nobody ever asks why. 🦆
//!
//! 🧠 Knowledge graph:
//! - `EnhancementGenerator<R>` owns its random source. Inject a seeded `StdRng` in tests,
//!   an OS-seeded one in production. No global RNG, no hidden state.
//! - Never fails. A `Uuid` is always a well-formed id, so there is nothing to validate.
//! - The content version is drawn from the same random source, so every call mints a new one.

use std::collections::BTreeMap;

use rand::Rng;
use serde_json::Value;
use uuid::Uuid;

use crate::common::{Annotation, Enhancement, EnhancementContent, Visibility};

/// 🧸 The toy box. Order doesn't matter, membership does.
pub const TOYS: &[&str] = &[
    "Woody",
    "Jessie",
    "Bullseye",
    "Stinky Pete",
    "Buzz Lightyear",
    "Rex",
    "Mr. Potatohead",
    "Mrs. Potato Head",
    "Bo Peep",
    "Slinky Dog",
    "Etch a Sketch",
    "Hamm",
    "Lenny",
    "Emperor Zurg", // uh oh
    // -- proof by induction
    "Little Green Man 1",
    "Little Green Man n",
    "Little Green Man n+1",
];

const TOY_SCHEME: &str = "meta:toy";
const TOY_LABEL: &str = "toy";

/// 🏭 Stamps toy enhancements onto reference ids.
#[derive(Debug)]
pub struct EnhancementGenerator<R> {
    source_name: String,
    robot_version: String,
    rng: R,
}

impl<R: Rng> EnhancementGenerator<R> {
    pub fn new(source_name: impl Into<String>, robot_version: impl Into<String>, rng: R) -> Self {
        Self {
            source_name: source_name.into(),
            robot_version: robot_version.into(),
            rng,
        }
    }

    /// 🎯 One reference id, one freshly minted enhancement.
    pub fn generate(&mut self, reference_id: Uuid) -> Enhancement {
        let toy = TOYS[self.rng.random_range(0..TOYS.len())];
        // -- 📊 k/100 for k in 0..=100, so the score always has at most two decimals
        let score = f64::from(self.rng.random_range(0u8..=100)) / 100.0;
        let content_version = uuid::Builder::from_random_bytes(self.rng.random()).into_uuid();

        Enhancement {
            reference_id,
            source: self.source_name.clone(),
            visibility: Visibility::Public,
            robot_version: self.robot_version.clone(),
            content_version,
            content: EnhancementContent::Annotation {
                annotations: vec![Annotation::Score {
                    scheme: TOY_SCHEME.to_string(),
                    label: TOY_LABEL.to_string(),
                    score,
                    data: BTreeMap::from([(TOY_LABEL.to_string(), Value::from(toy))]),
                }],
            },
        }
    }
}
