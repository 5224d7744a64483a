use shared_types::*;
use std::fs;
use std::path::Path;
use ts_rs::TS;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Generate TypeScript definitions for API types
    let mut types = Vec::new();

    // Billing event types
    types.push(clean_type(Period::export_to_string()?));
    types.push(clean_type(BillingEvent::export_to_string()?));
    types.push(clean_type(UpdatePeriodRequest::export_to_string()?));
    types.push(clean_type(BillingEventListResponse::export_to_string()?));
    types.push(clean_type(PeriodTotal::export_to_string()?));
    types.push(clean_type(FacilityTotal::export_to_string()?));
    types.push(clean_type(BillingSummary::export_to_string()?));

    // Cancellation types
    types.push(clean_type(CancellationKind::export_to_string()?));
    types.push(clean_type(Cancellation::export_to_string()?));
    types.push(clean_type(CancellationListResponse::export_to_string()?));
    types.push(clean_type(ReplacementRow::export_to_string()?));
    types.push(clean_type(ReplacementUploadRequest::export_to_string()?));
    types.push(clean_type(ReplacementUploadResponse::export_to_string()?));

    // RIPS types
    types.push(clean_type(RipsRecord::export_to_string()?));
    types.push(clean_type(RipsRecordsResponse::export_to_string()?));
    types.push(clean_type(RipsReport::export_to_string()?));
    types.push(clean_type(RipsReportsResponse::export_to_string()?));

    // Reference data types
    types.push(clean_type(Insurer::export_to_string()?));
    types.push(clean_type(CreateInsurerRequest::export_to_string()?));
    types.push(clean_type(UpdateInsurerRequest::export_to_string()?));
    types.push(clean_type(InsurersResponse::export_to_string()?));
    types.push(clean_type(Facility::export_to_string()?));
    types.push(clean_type(CreateFacilityRequest::export_to_string()?));
    types.push(clean_type(UpdateFacilityRequest::export_to_string()?));
    types.push(clean_type(FacilitiesResponse::export_to_string()?));
    types.push(clean_type(Cup::export_to_string()?));
    types.push(clean_type(CreateCupRequest::export_to_string()?));
    types.push(clean_type(UpdateCupRequest::export_to_string()?));
    types.push(clean_type(CupsResponse::export_to_string()?));
    types.push(clean_type(CupAssignment::export_to_string()?));
    types.push(clean_type(CreateCupAssignmentRequest::export_to_string()?));
    types.push(clean_type(CupAssignmentsResponse::export_to_string()?));

    // User types
    types.push(clean_type(UserRole::export_to_string()?));
    types.push(clean_type(User::export_to_string()?));
    types.push(clean_type(CreateUserRequest::export_to_string()?));
    types.push(clean_type(UpdateUserRequest::export_to_string()?));
    types.push(clean_type(UsersResponse::export_to_string()?));
    types.push(clean_type(LoginRequest::export_to_string()?));
    types.push(clean_type(LoginResponse::export_to_string()?));

    // Sync types
    types.push(clean_type(SyncRequest::export_to_string()?));
    types.push(clean_type(DateRange::export_to_string()?));
    types.push(clean_type(BillingSyncSummary::export_to_string()?));
    types.push(clean_type(CancellationSyncSummary::export_to_string()?));
    types.push(clean_type(PeriodBackfillSummary::export_to_string()?));
    types.push(clean_type(SyncKind::export_to_string()?));
    types.push(clean_type(LastUpdate::export_to_string()?));
    types.push(clean_type(PergamoLoginRequest::export_to_string()?));
    types.push(clean_type(PergamoLoginResponse::export_to_string()?));

    let output_dir = Path::new("../gui/src/api-types");
    fs::create_dir_all(output_dir)?;

    let output_path = output_dir.join("types.ts");
    let output = types.join("\n\n");

    fs::write(&output_path, output)?;
    println!("Generated TypeScript types in {}", output_path.display());

    Ok(())
}

fn clean_type(mut type_def: String) -> String {
    type_def.retain(|c| c != '\r');

    // Keep imports only when the definition references another exported type
    let lines: Vec<&str> = type_def.lines().collect();
    let has_import = lines
        .iter()
        .any(|line| line.trim().starts_with("import type"));

    let filtered: Vec<&str> = lines
        .iter()
        .filter(|line| {
            let trimmed = line.trim();
            if trimmed.starts_with("import type") {
                return has_import;
            }
            !trimmed.starts_with("// This file was generated")
                && !trimmed.starts_with("/* This file was generated")
        })
        .cloned()
        .collect();

    let result = filtered.join("\n").trim().to_string();
    if result.is_empty() {
        result
    } else {
        format!("{}\n", result)
    }
}
