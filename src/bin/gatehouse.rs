// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0
//! Main Gatehouse executable.
//!
//! This is the entry point of the `gatehouse` binary.

use axum::extract::DefaultBodyLimit;
use axum::http::{self, HeaderName, Request, header};
use clap::{Parser, ValueEnum};
use color_eyre::eyre::{Report, Result};
use eyre::WrapErr;
use sea_orm::{ConnectOptions, Database};
use secrecy::ExposeSecret;
use std::io::{self, BufRead};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::{net::TcpListener, signal};
use tower::ServiceBuilder;
use tower_http::{
    LatencyUnit, ServiceBuilderExt,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, info_span};
use tracing_subscriber::{
    Layer,
    filter::{LevelFilter, Targets},
    prelude::*,
};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use gatehouse::api;
use gatehouse::association::AssociationApi;
use gatehouse::config::Config;
use gatehouse::gatehouse::{Service, ServiceState};
use gatehouse::identity::{IdentityApi, types::UserCreateBuilder};
use gatehouse::policy;
use gatehouse::provider::Provider;

// Default body limit 256kB
const DEFAULT_BODY_LIMIT: usize = 1024 * 256;

/// Gatehouse identity provider.
///
/// Gatehouse authenticates end users, issues OpenID 2.0 assertions to
/// relying-party websites and brokers OAuth2 authorization codes and access
/// tokens for client applications sharing one user directory.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the gatehouse config file.
    #[arg(short, long, default_value = "/etc/gatehouse/gatehouse.conf")]
    config: PathBuf,

    /// Verbosity level. Repeat to increase level.
    #[arg(short, long, global=true, action = clap::ArgAction::Count, display_order = 920)]
    pub verbose: u8,

    /// Print the `OpenAPI` schema json instead of running the service.
    #[arg(long)]
    pub dump_openapi: Option<OpenApiFormat>,

    /// Hard-delete expired OpenID associations once and exit. Association
    /// cleanup is maintenance to be invoked explicitly; the service never
    /// schedules it on its own.
    #[arg(long)]
    pub cleanup_associations: bool,

    /// Create an initial superuser account and exit. The password is read
    /// from the first line of stdin.
    #[arg(long, num_args = 2, value_names = ["USERNAME", "EMAIL"])]
    pub create_superuser: Option<Vec<String>>,
}

#[derive(Clone, Debug, Default, PartialEq, ValueEnum)]
enum OpenApiFormat {
    /// Json.
    Json,
    #[default]
    /// Yaml.
    Yaml,
}

// A `MakeRequestId` issuing a fresh uuid per request
#[derive(Clone, Default)]
struct GatehouseRequestId {}

impl MakeRequestId for GatehouseRequestId {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        let req_id = Uuid::new_v4().simple().to_string();

        Some(RequestId::new(
            http::HeaderValue::from_str(format!("req-{req_id}").as_str())
                // default to static value. This is not expected to ever happen.
                .unwrap_or_else(|_| http::HeaderValue::from_static("req-unknown")),
        ))
    }
}

#[tokio::main]
async fn main() -> Result<(), Report> {
    let args = Args::parse();

    let filter = Targets::new().with_default(match args.verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    });

    let log_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_filter(filter);

    // build the tracing registry
    tracing_subscriber::registry().with(log_layer).init();

    let openapi = api::ApiDoc::openapi();

    let (router, api_doc) = OpenApiRouter::with_openapi(openapi.clone())
        .merge(api::openapi_router())
        .split_for_parts();

    if let Some(dump_format) = &args.dump_openapi {
        println!(
            "{}",
            match dump_format {
                OpenApiFormat::Yaml => api_doc.to_yaml()?,
                OpenApiFormat::Json => api_doc.to_pretty_json()?,
            }
        );
        return Ok(());
    }

    info!("Starting Gatehouse...");

    let cfg = Config::new(args.config)?;
    let opt: ConnectOptions = ConnectOptions::new(cfg.database.get_connection().expose_secret())
        // Prevent dumping the password in plaintext.
        .sqlx_logging(false)
        .to_owned();

    debug!("Establishing the database connection...");
    let conn = Database::connect(opt)
        .await
        .wrap_err("Database connection failed")?;

    let provider = Provider::new(cfg.clone())?;
    let shared_state = Arc::new(Service::new(cfg, conn, provider)?);

    if args.cleanup_associations {
        let removed = shared_state
            .provider
            .get_association_provider()
            .cleanup_associations(&shared_state)
            .await?;
        println!("Removed {removed} expired associations");
        return Ok(());
    }

    if let Some(superuser) = &args.create_superuser {
        let (username, email) = (&superuser[0], &superuser[1]);
        let password = io::stdin()
            .lock()
            .lines()
            .next()
            .transpose()?
            .ok_or_else(|| Report::msg("no password on stdin"))?;
        let user = shared_state
            .provider
            .get_identity_provider()
            .create_user(
                &shared_state,
                UserCreateBuilder::default()
                    .username(username.clone())
                    .email(email.clone())
                    .password(password)
                    .is_superuser(true)
                    .build()
                    .map_err(|err| Report::msg(err.to_string()))?,
            )
            .await?;
        println!("Created superuser {}", user.username);
        return Ok(());
    }

    let x_request_id = HeaderName::from_static("x-request-id");
    let sensitive_headers: Arc<[_]> = vec![header::AUTHORIZATION, header::COOKIE].into();

    let middleware = ServiceBuilder::new()
        // Inject x-request-id header into processing
        // make sure to set request ids before the request reaches `TraceLayer`
        .layer(SetRequestIdLayer::new(
            x_request_id.clone(),
            GatehouseRequestId::default(),
        ))
        .sensitive_request_headers(sensitive_headers.clone())
        .layer(DefaultBodyLimit::max(DEFAULT_BODY_LIMIT))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    info_span!(
                        "request",
                        method = ?request.method(),
                        uri = ?request.uri().path(),
                        x_request_id = ?request.headers().get("x-request-id")
                    )
                })
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .latency_unit(LatencyUnit::Micros),
                ),
        )
        // Compress responses
        .compression()
        .sensitive_response_headers(sensitive_headers)
        // propagate the header to the response before the response reaches `TraceLayer`
        .layer(PropagateRequestIdLayer::new(x_request_id));

    let app = router
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api_doc))
        .with_state(shared_state.clone());
    // The policy chain wraps every route, the session layer outermost.
    let app = policy::apply(app, &shared_state).layer(middleware);

    let address = SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080));
    let listener = TcpListener::bind(&address).await?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal(shared_state))
        .await?;

    Ok(())
}

async fn shutdown_signal(state: ServiceState) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    state.terminate().await.expect("terminating cleanly");
}
