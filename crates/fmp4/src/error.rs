#[derive(Debug, Clone, thiserror::Error)]
pub enum DemuxError {
    #[error("malformed init section: {reason}")]
    MalformedInitSection { reason: &'static str },

    #[error("malformed fragment: {reason}")]
    MalformedFragment { reason: &'static str },
}

impl DemuxError {
    pub fn init(reason: &'static str) -> Self {
        Self::MalformedInitSection { reason }
    }

    pub fn fragment(reason: &'static str) -> Self {
        Self::MalformedFragment { reason }
    }
}
