/// What happened to a single sub-request of a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubProbeStatus {
    /// The response was accepted and its value written.
    Emitted,
    /// The response was accepted but held no usable data; zero was written.
    EmittedWithoutData,
    /// The request could not be built. Nothing was written.
    ConstructionFailed,
    /// Transport failure or unaccepted status code. Nothing was written.
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubProbe {
    /// `received`, `rejected` (or any configured stat kind) or `rate_limit`.
    pub name: String,
    pub path: String,
    pub status: SubProbeStatus,
}

impl SubProbe {
    pub fn emitted(&self) -> bool {
        matches!(
            self.status,
            SubProbeStatus::Emitted | SubProbeStatus::EmittedWithoutData
        )
    }
}

/// The outcome of one probe, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub sub_probes: Vec<SubProbe>,
}

impl ProbeOutcome {
    pub fn all_succeeded(&self) -> bool {
        self.sub_probes.iter().all(SubProbe::emitted)
    }

    pub fn get(&self, name: &str) -> Option<&SubProbe> {
        self.sub_probes.iter().find(|sub_probe| sub_probe.name == name)
    }
}
