use crate::service::analysis::TrendAnalyzer;
use crate::service::roster::RosterService;
use crate::store::{AttendanceLedger, RosterStore};
use crate::utils::nisn_index::NisnIndex;
use std::sync::Arc;

/// Shared handles injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub roster: Arc<dyn RosterStore>,
    pub ledger: Arc<dyn AttendanceLedger>,
    pub nisn_index: Arc<NisnIndex>,
    pub analyzer: Option<Arc<dyn TrendAnalyzer>>,
}

impl AppState {
    pub fn roster_service(&self) -> RosterService {
        RosterService::new(self.roster.clone(), self.nisn_index.clone())
    }
}
