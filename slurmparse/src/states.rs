// State vocabularies.  squeue and sinfo print states in a handful of spellings (upper case, lower
// case, abbreviated, with `*`, `~`, `#` or `+` suffix flags), so classification is by case-insensitive
// prefix, first match wins.

/// The job states the exporter distinguishes.

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JobState {
    Pending,
    Running,
    Suspended,
    Cancelled,
    Completing,
    Completed,
    Configuring,
    Failed,
    Timeout,
    Preempted,
    NodeFail,
}

const JOB_STATE_PREFIXES: [(&str, JobState); 11] = [
    ("pending", JobState::Pending),
    ("running", JobState::Running),
    ("suspended", JobState::Suspended),
    ("cancelled", JobState::Cancelled),
    ("completing", JobState::Completing),
    ("completed", JobState::Completed),
    ("configuring", JobState::Configuring),
    ("failed", JobState::Failed),
    ("timeout", JobState::Timeout),
    ("preempted", JobState::Preempted),
    ("node_fail", JobState::NodeFail),
];

impl JobState {
    pub const ALL: [JobState; 11] = [
        JobState::Pending,
        JobState::Running,
        JobState::Suspended,
        JobState::Cancelled,
        JobState::Completing,
        JobState::Completed,
        JobState::Configuring,
        JobState::Failed,
        JobState::Timeout,
        JobState::Preempted,
        JobState::NodeFail,
    ];

    /// Classify a state as printed by squeue's `%T`.  Returns None for states outside the
    /// vocabulary (BOOT_FAIL, REQUEUED, STOPPED and so on).

    pub fn classify(state: &str) -> Option<JobState> {
        let state = state.trim().to_ascii_lowercase();
        JOB_STATE_PREFIXES
            .iter()
            .find(|(prefix, _)| state.starts_with(prefix))
            .map(|(_, s)| *s)
    }

    /// Lower-case name, as used in metric names.
    pub fn name(self) -> &'static str {
        JOB_STATE_PREFIXES
            .iter()
            .find(|(_, s)| *s == self)
            .map(|(name, _)| *name)
            .unwrap_or("other")
    }
}

/// Node states, coarsened.  Anything sinfo prints that is not one of the named prefixes is `Other`.

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeState {
    Allocated,
    Completing,
    Down,
    Drained,
    Failed,
    Error,
    Idle,
    Maintenance,
    Mixed,
    Reserved,
    Planned,
    #[default]
    Other,
}

// Tried in order.
const NODE_STATE_PREFIXES: [(&str, NodeState); 11] = [
    ("alloc", NodeState::Allocated),
    ("comp", NodeState::Completing),
    ("down", NodeState::Down),
    ("drain", NodeState::Drained),
    ("fail", NodeState::Failed),
    ("err", NodeState::Error),
    ("idle", NodeState::Idle),
    ("maint", NodeState::Maintenance),
    ("mix", NodeState::Mixed),
    ("res", NodeState::Reserved),
    ("planned", NodeState::Planned),
];

impl NodeState {
    pub const ALL: [NodeState; 12] = [
        NodeState::Allocated,
        NodeState::Completing,
        NodeState::Down,
        NodeState::Drained,
        NodeState::Failed,
        NodeState::Error,
        NodeState::Idle,
        NodeState::Maintenance,
        NodeState::Mixed,
        NodeState::Reserved,
        NodeState::Planned,
        NodeState::Other,
    ];

    pub fn classify(state: &str) -> NodeState {
        let state = state.trim().to_ascii_lowercase();
        NODE_STATE_PREFIXES
            .iter()
            .find(|(prefix, _)| state.starts_with(prefix))
            .map(|(_, s)| *s)
            .unwrap_or(NodeState::Other)
    }

    /// Short name, as used in metric names (`slurm_nodes_<name>`).
    pub fn name(self) -> &'static str {
        match self {
            NodeState::Allocated => "alloc",
            NodeState::Completing => "comp",
            NodeState::Down => "down",
            NodeState::Drained => "drain",
            NodeState::Failed => "fail",
            NodeState::Error => "err",
            NodeState::Idle => "idle",
            NodeState::Maintenance => "maint",
            NodeState::Mixed => "mix",
            NodeState::Reserved => "resv",
            NodeState::Planned => "planned",
            NodeState::Other => "other",
        }
    }
}

#[test]
fn test_job_state_classify() {
    assert!(JobState::classify("PENDING") == Some(JobState::Pending));
    assert!(JobState::classify("running") == Some(JobState::Running));
    assert!(JobState::classify(" COMPLETING ") == Some(JobState::Completing));
    assert!(JobState::classify("COMPLETED") == Some(JobState::Completed));
    assert!(JobState::classify("NODE_FAIL") == Some(JobState::NodeFail));
    assert!(JobState::classify("running_something") == Some(JobState::Running));
    assert!(JobState::classify("Pending_x") == Some(JobState::Pending));
    assert!(JobState::classify("BOOT_FAIL").is_none());
    assert!(JobState::classify("").is_none());
}

#[test]
fn test_job_state_names() {
    for s in JobState::ALL {
        assert!(JobState::classify(&s.name().to_uppercase()) == Some(s));
    }
    assert!(JobState::NodeFail.name() == "node_fail");
}

#[test]
fn test_node_state_classify() {
    assert!(NodeState::classify("allocated") == NodeState::Allocated);
    assert!(NodeState::classify("alloc+") == NodeState::Allocated);
    assert!(NodeState::classify("down*") == NodeState::Down);
    assert!(NodeState::classify("drained") == NodeState::Drained);
    assert!(NodeState::classify("draining") == NodeState::Drained);
    assert!(NodeState::classify("MIXED") == NodeState::Mixed);
    assert!(NodeState::classify("reserved") == NodeState::Reserved);
    assert!(NodeState::classify("maint") == NodeState::Maintenance);
    assert!(NodeState::classify("planned") == NodeState::Planned);
    assert!(NodeState::classify("future") == NodeState::Other);
    assert!(NodeState::classify("unknown*") == NodeState::Other);
    assert!(NodeState::Reserved.name() == "resv");
}
