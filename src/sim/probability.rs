use std::{fmt, str::FromStr};

/// The five tunable probabilities driving the automaton.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProbabilityName {
    Generation,
    Burnout,
    Ignition,
    Resurrection,
    Combustion,
}

impl ProbabilityName {
    pub const ALL: [ProbabilityName; 5] = [
        ProbabilityName::Generation,
        ProbabilityName::Burnout,
        ProbabilityName::Ignition,
        ProbabilityName::Resurrection,
        ProbabilityName::Combustion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProbabilityName::Generation => "generation",
            ProbabilityName::Burnout => "burnout",
            ProbabilityName::Ignition => "ignition",
            ProbabilityName::Resurrection => "resurrection",
            ProbabilityName::Combustion => "combustion",
        }
    }
}

impl fmt::Display for ProbabilityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProbabilityName {
    type Err = UnknownProbabilityName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = match s.trim().to_ascii_lowercase().as_str() {
            "generation" | "generative" => ProbabilityName::Generation,
            "burnout" => ProbabilityName::Burnout,
            "ignition" => ProbabilityName::Ignition,
            "resurrection" => ProbabilityName::Resurrection,
            "combustion" | "spontaneous-combustion" => ProbabilityName::Combustion,
            _ => return Err(UnknownProbabilityName(s.to_string())),
        };
        Ok(name)
    }
}

/// A probability write outside `[0, 1]` (or not a number at all).
///
/// Always recoverable: the model keeps the value it had before the write.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InvalidProbability {
    pub name: ProbabilityName,
    pub value: f64,
}

impl fmt::Display for InvalidProbability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid {} probability {}: must be between 0 and 1",
            self.name, self.value
        )
    }
}

impl std::error::Error for InvalidProbability {}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownProbabilityName(pub String);

impl fmt::Display for UnknownProbabilityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown probability `{}` (expected one of generation, burnout, ignition, resurrection, combustion)",
            self.0
        )
    }
}

impl std::error::Error for UnknownProbabilityName {}

/// The parameters controlling the simulation. Every value is within `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProbabilityModel {
    /// Chance that a cell is seeded as vegetation rather than terrain
    generation: f64,
    /// Chance, per neighbor tried, that a burning cell ignites that vegetation neighbor
    ignition: f64,
    /// Chance, per draw, that a burning cell burns out
    burnout: f64,
    /// Chance per tick that a burnt cell regrows into vegetation
    resurrection: f64,
    /// Per-trial chance for spontaneous ignition. Five trials must all pass,
    /// so the effective chance per idle tick is `combustion^5`
    combustion: f64,
}

impl Default for ProbabilityModel {
    fn default() -> Self {
        Self {
            generation: 0.5,
            ignition: 0.5,
            burnout: 0.5,
            resurrection: 0.5,
            combustion: 0.5,
        }
    }
}

fn validate(name: ProbabilityName, value: f64) -> Result<f64, InvalidProbability> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(InvalidProbability { name, value })
    }
}

impl ProbabilityModel {
    pub fn new(
        generation: f64,
        ignition: f64,
        burnout: f64,
        resurrection: f64,
        combustion: f64,
    ) -> Result<Self, InvalidProbability> {
        Ok(Self {
            generation: validate(ProbabilityName::Generation, generation)?,
            ignition: validate(ProbabilityName::Ignition, ignition)?,
            burnout: validate(ProbabilityName::Burnout, burnout)?,
            resurrection: validate(ProbabilityName::Resurrection, resurrection)?,
            combustion: validate(ProbabilityName::Combustion, combustion)?,
        })
    }

    pub fn generation(&self) -> f64 {
        self.generation
    }
    pub fn ignition(&self) -> f64 {
        self.ignition
    }
    pub fn burnout(&self) -> f64 {
        self.burnout
    }
    pub fn resurrection(&self) -> f64 {
        self.resurrection
    }
    pub fn combustion(&self) -> f64 {
        self.combustion
    }

    pub fn set_generation(&mut self, value: f64) -> Result<(), InvalidProbability> {
        self.set(ProbabilityName::Generation, value)
    }
    pub fn set_ignition(&mut self, value: f64) -> Result<(), InvalidProbability> {
        self.set(ProbabilityName::Ignition, value)
    }
    pub fn set_burnout(&mut self, value: f64) -> Result<(), InvalidProbability> {
        self.set(ProbabilityName::Burnout, value)
    }
    pub fn set_resurrection(&mut self, value: f64) -> Result<(), InvalidProbability> {
        self.set(ProbabilityName::Resurrection, value)
    }
    pub fn set_combustion(&mut self, value: f64) -> Result<(), InvalidProbability> {
        self.set(ProbabilityName::Combustion, value)
    }

    pub fn get(&self, name: ProbabilityName) -> f64 {
        match name {
            ProbabilityName::Generation => self.generation,
            ProbabilityName::Burnout => self.burnout,
            ProbabilityName::Ignition => self.ignition,
            ProbabilityName::Resurrection => self.resurrection,
            ProbabilityName::Combustion => self.combustion,
        }
    }

    /// Stores `value` under `name`, or rejects it and keeps the old value.
    pub fn set(&mut self, name: ProbabilityName, value: f64) -> Result<(), InvalidProbability> {
        let value = validate(name, value)?;
        let slot = match name {
            ProbabilityName::Generation => &mut self.generation,
            ProbabilityName::Burnout => &mut self.burnout,
            ProbabilityName::Ignition => &mut self.ignition,
            ProbabilityName::Resurrection => &mut self.resurrection,
            ProbabilityName::Combustion => &mut self.combustion,
        };
        *slot = value;
        Ok(())
    }

    /// All five values in canonical order.
    pub fn entries(&self) -> [(ProbabilityName, f64); 5] {
        ProbabilityName::ALL.map(|name| (name, self.get(name)))
    }

    /// Applies each update independently. Valid values are stored even when
    /// others in the batch are rejected; the rejections are returned.
    pub fn apply<I>(&mut self, updates: I) -> Vec<InvalidProbability>
    where
        I: IntoIterator<Item = (ProbabilityName, f64)>,
    {
        updates
            .into_iter()
            .filter_map(|(name, value)| self.set(name, value).err())
            .collect()
    }
}
