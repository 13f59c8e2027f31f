use crate::cooldown::ReplyAction;

/// Renders reply text for scripted actions, closing over the configured
/// scheduling and form links. Knowledge-base answers are produced elsewhere;
/// `render` returns `None` for that action so callers dispatch explicitly.
#[derive(Clone, Debug, Default)]
pub struct ReplyCatalog {
    calendar_link: Option<String>,
    form_url: Option<String>,
}

impl ReplyCatalog {
    pub fn new(calendar_link: Option<String>, form_url: Option<String>) -> Self {
        Self { calendar_link, form_url }
    }

    pub fn render(&self, action: ReplyAction) -> Option<String> {
        match action {
            ReplyAction::FullGreeting => {
                Some("👋 Hello! I'm your AI assistant. How can I help you today?".to_string())
            }
            ReplyAction::ShortGreeting => {
                Some("Hello again! What can I help you with?".to_string())
            }
            ReplyAction::SendFormLink => Some(match &self.form_url {
                Some(url) => format!("📝 Here's the application form: {url}"),
                None => "The application form isn't available right now, sorry!".to_string(),
            }),
            ReplyAction::FormReminder => Some("I already sent you the form above! ☝️".to_string()),
            ReplyAction::SendSchedulingLink => Some(match &self.calendar_link {
                Some(link) => format!("📅 You can book a time that suits you here: {link}"),
                None => "Scheduling isn't available right now, sorry!".to_string(),
            }),
            ReplyAction::TriggerEscalation => {
                Some("🙋 Got it! I'm connecting you with a human teammate now.".to_string())
            }
            ReplyAction::ConsultKnowledgeBase => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::cooldown::ReplyAction;

    use super::ReplyCatalog;

    fn catalog() -> ReplyCatalog {
        ReplyCatalog::new(
            Some("https://cal.example.com/intro".to_string()),
            Some("https://example.com/apply".to_string()),
        )
    }

    #[test]
    fn greeting_replies_use_the_fixed_strings() {
        assert_eq!(
            catalog().render(ReplyAction::FullGreeting).as_deref(),
            Some("👋 Hello! I'm your AI assistant. How can I help you today?")
        );
        assert_eq!(
            catalog().render(ReplyAction::ShortGreeting).as_deref(),
            Some("Hello again! What can I help you with?")
        );
    }

    #[test]
    fn form_link_reply_contains_the_configured_url() {
        let reply = catalog().render(ReplyAction::SendFormLink).expect("form reply");
        assert!(reply.contains("https://example.com/apply"));
    }

    #[test]
    fn form_reminder_is_the_fixed_string() {
        assert_eq!(
            catalog().render(ReplyAction::FormReminder).as_deref(),
            Some("I already sent you the form above! ☝️")
        );
    }

    #[test]
    fn scheduling_reply_contains_the_configured_link() {
        let reply = catalog().render(ReplyAction::SendSchedulingLink).expect("meeting reply");
        assert!(reply.contains("https://cal.example.com/intro"));
    }

    #[test]
    fn unconfigured_links_degrade_to_unavailable_text() {
        let bare = ReplyCatalog::default();
        let form = bare.render(ReplyAction::SendFormLink).expect("form reply");
        let meeting = bare.render(ReplyAction::SendSchedulingLink).expect("meeting reply");

        assert!(form.contains("isn't available"));
        assert!(meeting.contains("isn't available"));
    }

    #[test]
    fn knowledge_base_action_is_not_rendered_here() {
        assert_eq!(catalog().render(ReplyAction::ConsultKnowledgeBase), None);
    }
}
