use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "wayback-discover-diff API",
        version = "0.1.0",
        description = "Simhash fingerprints of archived web captures."
    ),
    paths(
        crate::routes::calculate_simhash,
        crate::routes::get_simhash,
        crate::routes::get_job,
        crate::routes::cancel_job,
        crate::routes::health,
    ),
    components(schemas(
        crate::dto::CalculateResponse,
        crate::dto::SimhashResponse,
        crate::dto::CompressedCapturesResponse,
        crate::dto::JobStatusResponse,
        crate::dto::JobSummaryResponse,
        crate::dto::HealthResponse,
        crate::dto::ErrorResponse,
    )),
    tags(
        (name = "simhash", description = "Fingerprint calculation and lookup"),
        (name = "jobs", description = "Fingerprinting job status"),
        (name = "system", description = "Health and system status"),
    )
)]
pub struct ApiDoc;
