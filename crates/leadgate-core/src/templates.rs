//! Bot reply templates.
//!
//! The core never hard-codes reply content at call sites: every reply is
//! fetched by key from this set. Defaults are bundled; operators can
//! override any subset from `{data_dir}/templates.toml`.

use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

/// Keys the handler pipeline fetches replies by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKey {
    Welcome,
    ChooseOptionAck,
    FormTemplate,
    FormReceived,
    PartnershipAck,
    OtherNeedsAck,
    QuestionReceived,
    InvalidOption,
    EscalationNotice,
}

/// The full reply template set.
#[derive(Debug, Clone)]
pub struct ReplyTemplates {
    pub welcome: String,
    pub choose_option_ack: String,
    pub form_template: String,
    pub form_received: String,
    pub partnership_ack: String,
    pub other_needs_ack: String,
    pub question_received: String,
    pub invalid_option: String,
    pub escalation_notice: String,
}

impl Default for ReplyTemplates {
    fn default() -> Self {
        Self {
            welcome: "Halo! Terima kasih sudah menghubungi kami \u{1f44b}\n\n\
                      Silakan balas dengan angka sesuai kebutuhan kamu:\n\
                      1. Konsultasi membuka usaha\n\
                      2. Kerja sama / kemitraan\n\
                      3. Kebutuhan lainnya"
                .into(),
            choose_option_ack: "Siap! Untuk mulai konsultasi, mohon isi form singkat berikut \
                                dan kirim balik ya."
                .into(),
            form_template: "Nama, Domisili:\n\
                            Sumber info:\n\
                            Jenis bisnis:\n\
                            Budget:\n\
                            Rencana mulai:"
                .into(),
            form_received: "Terima kasih, form kamu sudah kami terima lengkap \u{2705}\n\
                            Tim kami akan segera menghubungi kamu."
                .into(),
            partnership_ack: "Terima kasih atas minat kerja samanya! Tim partnership kami \
                              akan menghubungi kamu segera."
                .into(),
            other_needs_ack: "Baik, pesan kamu sudah kami teruskan ke tim kami. \
                              Mohon ditunggu ya."
                .into(),
            question_received: "Pesan kamu sudah kami terima dan teruskan ke tim kami. \
                                Mohon ditunggu ya."
                .into(),
            invalid_option: "Mohon balas dengan angka 1, 2, atau 3 sesuai menu di atas ya \u{1f64f}"
                .into(),
            escalation_notice: "Sepertinya kamu butuh bantuan langsung. Tim kami akan segera \
                                menghubungi kamu."
                .into(),
        }
    }
}

/// Optional overrides, all keys independent.
#[derive(Debug, Default, Deserialize)]
struct TemplateFile {
    welcome: Option<String>,
    choose_option_ack: Option<String>,
    form_template: Option<String>,
    form_received: Option<String>,
    partnership_ack: Option<String>,
    other_needs_ack: Option<String>,
    question_received: Option<String>,
    invalid_option: Option<String>,
    escalation_notice: Option<String>,
}

impl ReplyTemplates {
    /// Fetch a reply by key.
    pub fn get(&self, key: TemplateKey) -> &str {
        match key {
            TemplateKey::Welcome => &self.welcome,
            TemplateKey::ChooseOptionAck => &self.choose_option_ack,
            TemplateKey::FormTemplate => &self.form_template,
            TemplateKey::FormReceived => &self.form_received,
            TemplateKey::PartnershipAck => &self.partnership_ack,
            TemplateKey::OtherNeedsAck => &self.other_needs_ack,
            TemplateKey::QuestionReceived => &self.question_received,
            TemplateKey::InvalidOption => &self.invalid_option,
            TemplateKey::EscalationNotice => &self.escalation_notice,
        }
    }

    /// Load templates from `{data_dir}/templates.toml`, falling back to the
    /// defaults for missing keys or a missing file.
    pub fn load(data_dir: &str) -> Self {
        let mut templates = Self::default();
        let path = Path::new(data_dir).join("templates.toml");

        let Ok(content) = std::fs::read_to_string(&path) else {
            return templates;
        };

        match toml::from_str::<TemplateFile>(&content) {
            Ok(file) => {
                let overrides = [
                    (file.welcome, &mut templates.welcome),
                    (file.choose_option_ack, &mut templates.choose_option_ack),
                    (file.form_template, &mut templates.form_template),
                    (file.form_received, &mut templates.form_received),
                    (file.partnership_ack, &mut templates.partnership_ack),
                    (file.other_needs_ack, &mut templates.other_needs_ack),
                    (file.question_received, &mut templates.question_received),
                    (file.invalid_option, &mut templates.invalid_option),
                    (file.escalation_notice, &mut templates.escalation_notice),
                ];
                for (value, slot) in overrides {
                    if let Some(v) = value {
                        *slot = v;
                    }
                }
                info!("loaded reply templates from {}", path.display());
            }
            Err(e) => {
                warn!("failed to parse {}: {e}", path.display());
            }
        }

        templates
    }
}
