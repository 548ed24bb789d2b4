use primerdesk_protocol::Role;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimerTask {
    PickPcrPrimersAndHybProbe,
    PickPcrPrimers,
    PickPcrPrimersAndHybOligo,
    PickLeftOnly,
    PickRightOnly,
    PickHybProbeOnly,
    PickDetectionPrimers,
}

impl PrimerTask {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PickPcrPrimersAndHybProbe => "pick_pcr_primers_and_hyb_probe",
            Self::PickPcrPrimers => "pick_pcr_primers",
            Self::PickPcrPrimersAndHybOligo => "pick_pcr_primers_and_hyb_oligo",
            Self::PickLeftOnly => "pick_left_only",
            Self::PickRightOnly => "pick_right_only",
            Self::PickHybProbeOnly => "pick_hyb_probe_only",
            Self::PickDetectionPrimers => "pick_detection_primers",
        }
    }
}

/// Pick flag and literal sequence for one role.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleInput {
    pub pick: bool,
    pub sequence: String,
}

impl RoleInput {
    pub fn picked() -> Self {
        Self {
            pick: true,
            sequence: String::new(),
        }
    }

    pub fn supplied(sequence: &str) -> Self {
        Self {
            pick: false,
            sequence: sequence.to_string(),
        }
    }

    pub fn is_supplied(&self) -> bool {
        !self.sequence.trim().is_empty()
    }

    /// Picked or supplied. A set pick flag wins when both are present.
    pub fn is_selected(&self) -> bool {
        self.pick || self.is_supplied()
    }

    /// Supplied and not picked; the explanation summary shows "provided".
    pub fn is_provided_only(&self) -> bool {
        !self.pick && self.is_supplied()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSelection {
    pub left: RoleInput,
    pub right: RoleInput,
    pub probe: RoleInput,
}

impl RoleSelection {
    pub fn get(&self, role: Role) -> &RoleInput {
        match role {
            Role::Left => &self.left,
            Role::Right => &self.right,
            Role::Internal => &self.probe,
        }
    }

    pub fn task(&self) -> PrimerTask {
        determine_task(
            self.left.is_selected(),
            self.right.is_selected(),
            self.probe.is_selected(),
        )
    }
}

pub fn determine_task(left: bool, right: bool, probe: bool) -> PrimerTask {
    match (left, right, probe) {
        (true, true, true) => PrimerTask::PickPcrPrimersAndHybProbe,
        (true, true, false) => PrimerTask::PickPcrPrimers,
        (true, false, true) => PrimerTask::PickPcrPrimersAndHybOligo,
        (true, false, false) => PrimerTask::PickLeftOnly,
        (false, true, true) => PrimerTask::PickPcrPrimersAndHybOligo,
        (false, true, false) => PrimerTask::PickRightOnly,
        (false, false, true) => PrimerTask::PickHybProbeOnly,
        (false, false, false) => PrimerTask::PickDetectionPrimers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_table_is_exhaustive() {
        let expected = [
            ((true, true, true), "pick_pcr_primers_and_hyb_probe"),
            ((true, true, false), "pick_pcr_primers"),
            ((true, false, true), "pick_pcr_primers_and_hyb_oligo"),
            ((true, false, false), "pick_left_only"),
            ((false, true, true), "pick_pcr_primers_and_hyb_oligo"),
            ((false, true, false), "pick_right_only"),
            ((false, false, true), "pick_hyb_probe_only"),
            ((false, false, false), "pick_detection_primers"),
        ];
        for ((l, r, p), name) in expected {
            assert_eq!(determine_task(l, r, p).as_str(), name, "{l} {r} {p}");
        }
    }

    #[test]
    fn test_supplied_sequence_counts_as_selected() {
        let selection = RoleSelection {
            left: RoleInput::supplied("ACGTACGTACGTACGTACGT"),
            right: RoleInput::picked(),
            probe: RoleInput::supplied("   "),
        };
        assert_eq!(selection.task(), PrimerTask::PickPcrPrimers);
        assert!(selection.left.is_provided_only());
        assert!(!selection.probe.is_selected());
    }

    #[test]
    fn test_pick_and_literal_together_are_tolerated() {
        let left = RoleInput {
            pick: true,
            sequence: "ACGT".to_string(),
        };
        assert!(left.is_selected());
        assert!(!left.is_provided_only());
        let selection = RoleSelection {
            left,
            ..RoleSelection::default()
        };
        assert_eq!(selection.task(), PrimerTask::PickLeftOnly);
    }
}
