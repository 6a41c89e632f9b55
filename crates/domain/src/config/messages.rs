use serde::{Deserialize, Serialize};

/// User-facing texts published when a turn cannot produce a model answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesConfig {
    /// Sent when no usable credentials could be loaded. The load error is
    /// appended as ` (Error: <reason>)`.
    #[serde(default = "d_auth_required")]
    pub auth_required: String,
    /// Sent when the first model submission fails.
    #[serde(default = "d_model_error")]
    pub model_error: String,
    /// Sent when resubmitting tool results to the model fails.
    #[serde(default = "d_tool_report_error")]
    pub tool_report_error: String,
    /// Sent when the model produced no text at all.
    #[serde(default = "d_fallback")]
    pub fallback: String,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            auth_required: d_auth_required(),
            model_error: d_model_error(),
            tool_report_error: d_tool_report_error(),
            fallback: d_fallback(),
        }
    }
}

fn d_auth_required() -> String {
    "Lo siento, necesito que autorices tu cuenta de Google. Puedes hacerlo siguiendo las instrucciones del servidor MCP.".into()
}
fn d_model_error() -> String {
    "Lo siento, hubo un error al procesar tu solicitud con el modelo de IA. Intenta de nuevo.".into()
}
fn d_tool_report_error() -> String {
    "Lo siento, hubo un error al comunicar el resultado de las acciones.".into()
}
fn d_fallback() -> String {
    "Lo siento, no pude generar una respuesta clara.".into()
}
