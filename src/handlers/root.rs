//! Root endpoint handler for the landing page.

use axum::{extract::State, response::Html};

use crate::state::SharedState;

/// Handler for `/`, linking to the metrics endpoint.
pub async fn root_handler(State(state): State<SharedState>) -> Html<String> {
    let path = state.config.metrics_path();
    Html(format!(
        "<html>\n\
         <head><title>OpenIO Exporter</title></head>\n\
         <body>\n\
         <h1>OpenIO Exporter</h1>\n\
         <p><a href=\"{path}\">Metrics</a></p>\n\
         </body>\n\
         </html>\n"
    ))
}
