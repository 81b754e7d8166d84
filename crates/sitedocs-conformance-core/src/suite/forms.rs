// crates/sitedocs-conformance-core/src/suite/forms.rs
// ============================================================================
// Module: Forms Cases
// Description: Conformance cases for the `/forms` endpoints.
// Purpose: Verify form lookup, content, search, and authorization.
// Dependencies: reqwest, serde_json
// ============================================================================

use reqwest::StatusCode;

use super::Case;
use super::CaseError;
use super::CaseFuture;
use super::Group;
use super::SuiteContext;
use super::empty_body;
use super::reject_sentinel;
use crate::assertions::FORM_FIELDS;
use crate::assertions::expect_array_len;
use crate::assertions::expect_client_error;
use crate::assertions::expect_contains;
use crate::assertions::expect_each_field_eq;
use crate::assertions::expect_equal;
use crate::assertions::expect_fields;
use crate::assertions::expect_message;
use crate::assertions::expect_status;
use crate::assertions::response_json;
use crate::client::ApiRequest;
use crate::credential::Credential;
use crate::endpoints::Endpoint;

/// Identifier no form will ever carry.
const INVALID_FORM_ID: &str = "invalidFormID";
/// Page size for the exact-count search.
const SEARCH_COUNT: usize = 5;
/// Page size for the type-filter search.
const SEARCH_FILTER_COUNT: &str = "100";

/// Forms cases in catalog order.
pub(super) const CASES: &[Case] = &[
    Case {
        group: Group::Forms,
        name: "get_form_by_id",
        mutates: false,
        run: get_form_by_id,
    },
    Case {
        group: Group::Forms,
        name: "get_form_unauthorized",
        mutates: false,
        run: get_form_unauthorized,
    },
    Case {
        group: Group::Forms,
        name: "get_form_invalid_id",
        mutates: false,
        run: get_form_invalid_id,
    },
    Case {
        group: Group::Forms,
        name: "get_form_content",
        mutates: false,
        run: get_form_content,
    },
    Case {
        group: Group::Forms,
        name: "search_forms_count",
        mutates: false,
        run: search_forms_count,
    },
    Case {
        group: Group::Forms,
        name: "search_forms_type_filter",
        mutates: false,
        run: search_forms_type_filter,
    },
    Case {
        group: Group::Forms,
        name: "forms_reject_sentinel",
        mutates: false,
        run: forms_reject_sentinel,
    },
];

/// The form fixture's endpoint.
fn form_endpoint(ctx: &SuiteContext) -> Endpoint {
    Endpoint::Form(ctx.fixtures.ids.form_id.clone())
}

/// `formTypeId` for searches, or a skip when the fixture lacks one.
fn form_type_id(ctx: &SuiteContext) -> Result<String, CaseError> {
    ctx.fixtures
        .form_type_id()
        .ok_or_else(|| CaseError::Skipped("form fixture has no DocumentTemplateId".to_string()))
}

/// GET `/forms/{id}` returns the fixture and every form field.
fn get_form_by_id(ctx: &SuiteContext) -> CaseFuture<'_> {
    Box::pin(async move {
        let response = ctx.client.send(&ApiRequest::get(form_endpoint(ctx))).await?;
        expect_status(&response, StatusCode::OK)?;
        let body = response_json(&response)?;
        expect_contains(body, &ctx.fixtures.form)?;
        expect_fields(body, FORM_FIELDS)?;
        Ok(())
    })
}

/// GET `/forms/{id}` with the sentinel key is rejected.
fn get_form_unauthorized(ctx: &SuiteContext) -> CaseFuture<'_> {
    Box::pin(async move {
        let request = ApiRequest::get(form_endpoint(ctx)).with_credential(Credential::Sentinel);
        let response = ctx.client.send(&request).await?;
        expect_status(&response, StatusCode::UNAUTHORIZED)?;
        Ok(())
    })
}

/// GET `/forms/invalidFormID` returns the vendor's not-found message.
fn get_form_invalid_id(ctx: &SuiteContext) -> CaseFuture<'_> {
    Box::pin(async move {
        let endpoint = Endpoint::Form(INVALID_FORM_ID.to_string());
        let url = ctx.client.url_for(&endpoint, &[])?;
        let response = ctx.client.send(&ApiRequest::get(endpoint)).await?;
        expect_client_error(&response)?;
        let expected = format!("No HTTP resource was found that matches the request URI '{url}'.");
        expect_message(response_json(&response)?, &expected)?;
        Ok(())
    })
}

/// GET `/forms/content/{id}` equals the content fixture exactly.
fn get_form_content(ctx: &SuiteContext) -> CaseFuture<'_> {
    Box::pin(async move {
        let endpoint = Endpoint::FormContent(ctx.fixtures.ids.form_id.clone());
        let response = ctx.client.send(&ApiRequest::get(endpoint)).await?;
        expect_status(&response, StatusCode::OK)?;
        expect_equal(response_json(&response)?, &ctx.fixtures.form_content)?;
        Ok(())
    })
}

/// GET `/forms?count=5` returns exactly five forms.
fn search_forms_count(ctx: &SuiteContext) -> CaseFuture<'_> {
    Box::pin(async move {
        let request = ApiRequest::get(Endpoint::Forms)
            .with_query("count", SEARCH_COUNT.to_string())
            .with_query("formTypeId", form_type_id(ctx)?);
        let response = ctx.client.send(&request).await?;
        expect_status(&response, StatusCode::OK)?;
        expect_array_len(response_json(&response)?, SEARCH_COUNT)?;
        Ok(())
    })
}

/// GET `/forms?formTypeId=` only returns forms of that template.
fn search_forms_type_filter(ctx: &SuiteContext) -> CaseFuture<'_> {
    Box::pin(async move {
        let type_id = form_type_id(ctx)?;
        let expected = ctx.fixtures.form.get("DocumentTemplateId").cloned().unwrap_or_default();
        let request = ApiRequest::get(Endpoint::Forms)
            .with_query("count", SEARCH_FILTER_COUNT)
            .with_query("formTypeId", type_id);
        let response = ctx.client.send(&request).await?;
        expect_status(&response, StatusCode::OK)?;
        expect_each_field_eq(response_json(&response)?, "DocumentTemplateId", &expected)?;
        Ok(())
    })
}

/// Every forms endpoint rejects the sentinel key.
fn forms_reject_sentinel(ctx: &SuiteContext) -> CaseFuture<'_> {
    Box::pin(async move {
        let form_id = ctx.fixtures.ids.form_id.clone();
        reject_sentinel(
            ctx,
            &[
                (Endpoint::Form(form_id.clone()), empty_body()),
                (Endpoint::FormContent(form_id), empty_body()),
                (Endpoint::Forms, empty_body()),
            ],
        )
        .await
    })
}
