use serde::{Deserialize, Serialize};

pub mod billing_event;
pub mod cancellation;
pub mod cup;
pub mod facility;
pub mod insurer;
pub mod rips;
pub mod sync;
pub mod user;

pub use billing_event::{
    BillingEvent, BillingEventListResponse, BillingSummary, FacilityTotal, Period, PeriodTotal,
    UpdatePeriodRequest,
};
pub use cancellation::{
    Cancellation, CancellationKind, CancellationListResponse, ReplacementRow,
    ReplacementUploadRequest, ReplacementUploadResponse,
};
pub use cup::{
    CreateCupAssignmentRequest, CreateCupRequest, Cup, CupAssignment, CupAssignmentsResponse,
    CupsResponse, UpdateCupRequest,
};
pub use facility::{CreateFacilityRequest, FacilitiesResponse, Facility, UpdateFacilityRequest};
pub use insurer::{CreateInsurerRequest, Insurer, InsurersResponse, UpdateInsurerRequest};
pub use rips::{RipsRecord, RipsRecordsResponse, RipsReport, RipsReportsResponse};
pub use sync::{
    BillingSyncSummary, CancellationSyncSummary, DateRange, LastUpdate, PergamoLoginRequest,
    PergamoLoginResponse, PeriodBackfillSummary, SyncKind, SyncRequest,
};
pub use user::{
    CreateUserRequest, LoginRequest, LoginResponse, UpdateUserRequest, User, UserRole,
    UsersResponse,
};

/// Error response for API endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
