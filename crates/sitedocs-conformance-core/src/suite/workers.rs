// crates/sitedocs-conformance-core/src/suite/workers.rs
// ============================================================================
// Module: Workers Cases
// Description: Conformance cases for the `/workers` endpoints.
// Purpose: Verify lookups, listing, mutation round trips, and media.
// Dependencies: reqwest
// ============================================================================

use reqwest::StatusCode;
use serde_json::Value;

use super::Case;
use super::CaseFuture;
use super::Group;
use super::SuiteContext;
use super::empty_body;
use super::reject_sentinel;
use crate::assertions::AssertionError;
use crate::assertions::expect_array;
use crate::assertions::expect_client_error;
use crate::assertions::expect_contains;
use crate::assertions::expect_content_type;
use crate::assertions::expect_field_eq;
use crate::assertions::expect_non_empty_body;
use crate::assertions::expect_status;
use crate::assertions::response_json;
use crate::client::ApiRequest;
use crate::client::ApiResponse;
use crate::credential::Credential;
use crate::endpoints::Endpoint;
use crate::scenario::MutationScenario;
use crate::scenario::ReadCheck;

/// Identifier no worker will ever carry.
const INVALID_WORKER_ID: &str = "invalidWorkerID";
/// Media type of worker photos.
const PHOTO_MEDIA_TYPE: &str = "image/png";

/// Workers cases in catalog order.
pub(super) const CASES: &[Case] = &[
    Case {
        group: Group::Workers,
        name: "get_worker_by_id",
        mutates: false,
        run: get_worker_by_id,
    },
    Case {
        group: Group::Workers,
        name: "get_worker_unauthorized",
        mutates: false,
        run: get_worker_unauthorized,
    },
    Case {
        group: Group::Workers,
        name: "get_worker_invalid_id",
        mutates: false,
        run: get_worker_invalid_id,
    },
    Case {
        group: Group::Workers,
        name: "list_workers",
        mutates: false,
        run: list_workers,
    },
    Case {
        group: Group::Workers,
        name: "patch_worker_round_trip",
        mutates: true,
        run: patch_worker_round_trip,
    },
    Case {
        group: Group::Workers,
        name: "put_worker_idempotent",
        mutates: true,
        run: put_worker_idempotent,
    },
    Case {
        group: Group::Workers,
        name: "worker_status_round_trip",
        mutates: true,
        run: worker_status_round_trip,
    },
    Case {
        group: Group::Workers,
        name: "get_worker_photo",
        mutates: false,
        run: get_worker_photo,
    },
    Case {
        group: Group::Workers,
        name: "get_worker_locations",
        mutates: false,
        run: get_worker_locations,
    },
    Case {
        group: Group::Workers,
        name: "get_permission_profiles",
        mutates: false,
        run: get_permission_profiles,
    },
    Case {
        group: Group::Workers,
        name: "workers_reject_sentinel",
        mutates: false,
        run: workers_reject_sentinel,
    },
];

/// The worker fixture's endpoint.
fn worker_endpoint(ctx: &SuiteContext) -> Endpoint {
    Endpoint::Worker(ctx.fixtures.ids.worker_id.clone())
}

/// Read confirming the worker matches its fixture.
fn worker_baseline(ctx: &SuiteContext, label: &str) -> ReadCheck {
    ReadCheck::contains(label, ApiRequest::get(worker_endpoint(ctx)), ctx.fixtures.worker.clone())
}

/// GET `/workers/{id}` returns the fixture.
fn get_worker_by_id(ctx: &SuiteContext) -> CaseFuture<'_> {
    Box::pin(async move {
        let response = ctx.client.send(&ApiRequest::get(worker_endpoint(ctx))).await?;
        expect_status(&response, StatusCode::OK)?;
        expect_contains(response_json(&response)?, &ctx.fixtures.worker)?;
        Ok(())
    })
}

/// GET `/workers/{id}` with the sentinel key is rejected.
fn get_worker_unauthorized(ctx: &SuiteContext) -> CaseFuture<'_> {
    Box::pin(async move {
        let request = ApiRequest::get(worker_endpoint(ctx)).with_credential(Credential::Sentinel);
        let response = ctx.client.send(&request).await?;
        expect_status(&response, StatusCode::UNAUTHORIZED)?;
        Ok(())
    })
}

/// GET `/workers/invalidWorkerID` is a client error.
fn get_worker_invalid_id(ctx: &SuiteContext) -> CaseFuture<'_> {
    Box::pin(async move {
        let request = ApiRequest::get(Endpoint::Worker(INVALID_WORKER_ID.to_string()));
        let response = ctx.client.send(&request).await?;
        expect_client_error(&response)?;
        Ok(())
    })
}

/// GET `/workers` returns an array.
fn list_workers(ctx: &SuiteContext) -> CaseFuture<'_> {
    Box::pin(async move {
        let response = ctx.client.send(&ApiRequest::get(Endpoint::Workers)).await?;
        expect_status(&response, StatusCode::OK)?;
        expect_array(response_json(&response)?)?;
        Ok(())
    })
}

/// PATCH `/workers` with the patch fixture, then restore the baseline.
fn patch_worker_round_trip(ctx: &SuiteContext) -> CaseFuture<'_> {
    Box::pin(async move {
        let fixtures = &ctx.fixtures;
        let scenario = MutationScenario {
            label: "patch worker".to_string(),
            precondition: Some(worker_baseline(ctx, "worker baseline")),
            forward: ApiRequest::patch(Endpoint::Workers, fixtures.worker_patch.clone()),
            forward_check: Some(ReadCheck::contains(
                "worker patched",
                ApiRequest::get(worker_endpoint(ctx)),
                fixtures.worker_patch.clone(),
            )),
            restore: ApiRequest::patch(Endpoint::Workers, fixtures.worker.clone()),
            restore_check: worker_baseline(ctx, "worker restored"),
        };
        scenario.run(&ctx.client, ctx.poll).await?;
        Ok(())
    })
}

/// PUT `/workers/{id}` with the fixture leaves the worker unchanged.
fn put_worker_idempotent(ctx: &SuiteContext) -> CaseFuture<'_> {
    Box::pin(async move {
        let request = ApiRequest::put(worker_endpoint(ctx), ctx.fixtures.worker.clone());
        let response = ctx.client.send(&request).await?;
        expect_status(&response, StatusCode::OK)?;
        worker_baseline(ctx, "worker unchanged").poll(&ctx.client, ctx.poll).await?;
        Ok(())
    })
}

/// DELETE `/workers/status` deactivates the worker; POST reactivates it.
fn worker_status_round_trip(ctx: &SuiteContext) -> CaseFuture<'_> {
    Box::pin(async move {
        let body = ctx.fixtures.worker_status_body();
        let scenario = MutationScenario {
            label: "worker status".to_string(),
            precondition: Some(worker_baseline(ctx, "worker active")),
            forward: ApiRequest::delete(Endpoint::WorkerStatus, body.clone()),
            forward_check: Some(ReadCheck::new(
                "worker deactivated",
                ApiRequest::get(worker_endpoint(ctx)),
                |response: &ApiResponse| -> Result<(), AssertionError> {
                    expect_status(response, StatusCode::OK)?;
                    expect_field_eq(response_json(response)?, "IsActive", &Value::Bool(false))
                },
            )),
            restore: ApiRequest::post(Endpoint::WorkerStatus, body),
            restore_check: worker_baseline(ctx, "worker reactivated"),
        };
        scenario.run(&ctx.client, ctx.poll).await?;
        Ok(())
    })
}

/// GET `/workers/photo/{id}` returns a PNG.
fn get_worker_photo(ctx: &SuiteContext) -> CaseFuture<'_> {
    Box::pin(async move {
        let endpoint = Endpoint::WorkerPhoto(ctx.fixtures.ids.worker_id.clone());
        let response = ctx.client.send(&ApiRequest::get(endpoint)).await?;
        expect_status(&response, StatusCode::OK)?;
        expect_content_type(&response, PHOTO_MEDIA_TYPE)?;
        expect_non_empty_body(&response)?;
        Ok(())
    })
}

/// GET `/workers/{id}/locations` returns an array.
fn get_worker_locations(ctx: &SuiteContext) -> CaseFuture<'_> {
    Box::pin(async move {
        let endpoint = Endpoint::WorkerLocations(ctx.fixtures.ids.worker_id.clone());
        let response = ctx.client.send(&ApiRequest::get(endpoint)).await?;
        expect_status(&response, StatusCode::OK)?;
        expect_array(response_json(&response)?)?;
        Ok(())
    })
}

/// GET `/workers/permissionProfile` returns JSON.
fn get_permission_profiles(ctx: &SuiteContext) -> CaseFuture<'_> {
    Box::pin(async move {
        let response = ctx.client.send(&ApiRequest::get(Endpoint::WorkerPermissionProfile)).await?;
        expect_status(&response, StatusCode::OK)?;
        response_json(&response)?;
        Ok(())
    })
}

/// Every workers endpoint and verb rejects the sentinel key.
fn workers_reject_sentinel(ctx: &SuiteContext) -> CaseFuture<'_> {
    Box::pin(async move {
        let fixtures = &ctx.fixtures;
        let worker_id = fixtures.ids.worker_id.clone();
        reject_sentinel(
            ctx,
            &[
                (worker_endpoint(ctx), fixtures.worker.clone()),
                (Endpoint::Workers, fixtures.worker_patch.clone()),
                (Endpoint::WorkerStatus, fixtures.worker_status_body()),
                (Endpoint::WorkerPhoto(worker_id.clone()), empty_body()),
                (Endpoint::WorkerLocations(worker_id), empty_body()),
                (Endpoint::WorkerPermissionProfile, empty_body()),
            ],
        )
        .await
    })
}
