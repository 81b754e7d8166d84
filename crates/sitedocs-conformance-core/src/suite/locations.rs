// crates/sitedocs-conformance-core/src/suite/locations.rs
// ============================================================================
// Module: Locations Cases
// Description: Conformance cases for the `/locations` endpoints.
// Purpose: Verify lookups, listing, archive toggles, and worker assignment.
// Dependencies: reqwest, serde_json
// ============================================================================

use reqwest::StatusCode;
use serde_json::Value;

use super::Case;
use super::CaseError;
use super::CaseFuture;
use super::Group;
use super::SuiteContext;
use super::reject_sentinel;
use crate::assertions::AssertionError;
use crate::assertions::LOCATION_FIELDS;
use crate::assertions::expect_array;
use crate::assertions::expect_array_len;
use crate::assertions::expect_contains;
use crate::assertions::expect_field_eq;
use crate::assertions::expect_fields;
use crate::assertions::expect_status;
use crate::assertions::response_json;
use crate::client::ApiRequest;
use crate::client::ApiResponse;
use crate::credential::Credential;
use crate::endpoints::Endpoint;
use crate::scenario::MutationScenario;
use crate::scenario::ReadCheck;

/// Locations cases in catalog order.
pub(super) const CASES: &[Case] = &[
    Case {
        group: Group::Locations,
        name: "get_location_by_id",
        mutates: false,
        run: get_location_by_id,
    },
    Case {
        group: Group::Locations,
        name: "get_location_unauthorized",
        mutates: false,
        run: get_location_unauthorized,
    },
    Case {
        group: Group::Locations,
        name: "list_locations",
        mutates: false,
        run: list_locations,
    },
    Case {
        group: Group::Locations,
        name: "patch_location_round_trip",
        mutates: true,
        run: patch_location_round_trip,
    },
    Case {
        group: Group::Locations,
        name: "location_status_round_trip",
        mutates: true,
        run: location_status_round_trip,
    },
    Case {
        group: Group::Locations,
        name: "location_worker_round_trip",
        mutates: true,
        run: location_worker_round_trip,
    },
    Case {
        group: Group::Locations,
        name: "locations_reject_sentinel",
        mutates: false,
        run: locations_reject_sentinel,
    },
];

/// The location fixture's endpoint.
fn location_endpoint(ctx: &SuiteContext) -> Endpoint {
    Endpoint::Location(ctx.fixtures.ids.location_id.clone())
}

/// Read confirming the location matches its fixture.
fn location_baseline(ctx: &SuiteContext, label: &str) -> ReadCheck {
    ReadCheck::contains(label, ApiRequest::get(location_endpoint(ctx)), ctx.fixtures.location.clone())
}

/// Read confirming the worker is assigned to exactly the fixture location.
fn assignment_baseline(ctx: &SuiteContext, label: &str) -> ReadCheck {
    let location_id = ctx
        .fixtures
        .location
        .get("Id")
        .cloned()
        .unwrap_or_else(|| Value::String(ctx.fixtures.ids.location_id.clone()));
    ReadCheck::new(
        label,
        ApiRequest::get(Endpoint::WorkerLocations(ctx.fixtures.ids.worker_id.clone())),
        move |response: &ApiResponse| -> Result<(), AssertionError> {
            expect_status(response, StatusCode::OK)?;
            let items = expect_array_len(response_json(response)?, 1)?;
            for item in items {
                expect_fields(item, LOCATION_FIELDS)?;
                expect_field_eq(item, "Id", &location_id)?;
            }
            Ok(())
        },
    )
}

/// GET `/locations/{id}` returns the fixture and every location field.
fn get_location_by_id(ctx: &SuiteContext) -> CaseFuture<'_> {
    Box::pin(async move {
        let response = ctx.client.send(&ApiRequest::get(location_endpoint(ctx))).await?;
        expect_status(&response, StatusCode::OK)?;
        let body = response_json(&response)?;
        expect_contains(body, &ctx.fixtures.location)?;
        expect_fields(body, LOCATION_FIELDS)?;
        Ok(())
    })
}

/// GET `/locations/{id}` with the sentinel key is rejected.
fn get_location_unauthorized(ctx: &SuiteContext) -> CaseFuture<'_> {
    Box::pin(async move {
        let request = ApiRequest::get(location_endpoint(ctx)).with_credential(Credential::Sentinel);
        let response = ctx.client.send(&request).await?;
        expect_status(&response, StatusCode::UNAUTHORIZED)?;
        Ok(())
    })
}

/// GET `/locations` returns an array.
fn list_locations(ctx: &SuiteContext) -> CaseFuture<'_> {
    Box::pin(async move {
        let response = ctx.client.send(&ApiRequest::get(Endpoint::Locations)).await?;
        expect_status(&response, StatusCode::OK)?;
        expect_array(response_json(&response)?)?;
        Ok(())
    })
}

/// PATCH `/locations` with the patch fixture, then restore the baseline.
fn patch_location_round_trip(ctx: &SuiteContext) -> CaseFuture<'_> {
    Box::pin(async move {
        let Some(patch) = ctx.fixtures.location_patch.clone() else {
            return Err(CaseError::Skipped("locationPatch.json not provided".to_string()));
        };
        let scenario = MutationScenario {
            label: "patch location".to_string(),
            precondition: Some(location_baseline(ctx, "location baseline")),
            forward: ApiRequest::patch(Endpoint::Locations, patch.clone()),
            forward_check: Some(ReadCheck::contains(
                "location patched",
                ApiRequest::get(location_endpoint(ctx)),
                patch,
            )),
            restore: ApiRequest::patch(Endpoint::Locations, ctx.fixtures.location.clone()),
            restore_check: location_baseline(ctx, "location restored"),
        };
        scenario.run(&ctx.client, ctx.poll).await?;
        Ok(())
    })
}

/// DELETE `/locations/status` archives the location; POST reactivates it.
fn location_status_round_trip(ctx: &SuiteContext) -> CaseFuture<'_> {
    Box::pin(async move {
        let body = ctx.fixtures.location_status_body();
        let scenario = MutationScenario {
            label: "location status".to_string(),
            precondition: Some(location_baseline(ctx, "location active")),
            forward: ApiRequest::delete(Endpoint::LocationStatus, body.clone()),
            forward_check: Some(ReadCheck::new(
                "location archived",
                ApiRequest::get(location_endpoint(ctx)),
                |response: &ApiResponse| -> Result<(), AssertionError> {
                    expect_status(response, StatusCode::OK)?;
                    expect_field_eq(response_json(response)?, "IsArchived", &Value::Bool(true))
                },
            )),
            restore: ApiRequest::post(Endpoint::LocationStatus, body),
            restore_check: location_baseline(ctx, "location reactivated"),
        };
        scenario.run(&ctx.client, ctx.poll).await?;
        Ok(())
    })
}

/// DELETE `/locations/worker` unassigns the worker; POST assigns it again.
fn location_worker_round_trip(ctx: &SuiteContext) -> CaseFuture<'_> {
    Box::pin(async move {
        let body = ctx.fixtures.location_worker_body();
        let scenario = MutationScenario {
            label: "location worker".to_string(),
            precondition: Some(assignment_baseline(ctx, "worker assigned")),
            forward: ApiRequest::delete(Endpoint::LocationWorker, body.clone()),
            forward_check: Some(ReadCheck::new(
                "worker unassigned",
                ApiRequest::get(Endpoint::WorkerLocations(ctx.fixtures.ids.worker_id.clone())),
                |response: &ApiResponse| -> Result<(), AssertionError> {
                    expect_status(response, StatusCode::OK)?;
                    expect_array_len(response_json(response)?, 0)?;
                    Ok(())
                },
            )),
            restore: ApiRequest::post(Endpoint::LocationWorker, body),
            restore_check: assignment_baseline(ctx, "worker reassigned"),
        };
        scenario.run(&ctx.client, ctx.poll).await?;
        Ok(())
    })
}

/// Every locations endpoint and verb rejects the sentinel key.
fn locations_reject_sentinel(ctx: &SuiteContext) -> CaseFuture<'_> {
    Box::pin(async move {
        let fixtures = &ctx.fixtures;
        reject_sentinel(
            ctx,
            &[
                (location_endpoint(ctx), fixtures.location.clone()),
                (Endpoint::Locations, fixtures.location.clone()),
                (Endpoint::LocationStatus, fixtures.location_status_body()),
                (Endpoint::LocationWorker, fixtures.location_worker_body()),
            ],
        )
        .await
    })
}
