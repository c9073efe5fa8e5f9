//! Server startup integration tests.
//!
//! Tests that each function server can be instantiated from configuration
//! and provides correct server info.

use lesson_helper_common::Config;
use rmcp::ServerHandler;

/// Configuration with every secret a server might need.
fn test_config() -> Config {
    Config {
        gemini_api_key: Some("test-key".to_string()),
        shared_secret: Some("test-secret".to_string()),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lesson_helper_common::ConfigError;
    use lesson_helper_speech::SpeechServer;
    use lesson_helper_tutor::TutorServer;

    #[test]
    fn test_tutor_server_startup() {
        let server = TutorServer::new(test_config()).expect("tutor should start with a key");
        let info = server.get_info();

        let instructions = info.instructions.as_ref().unwrap().to_lowercase();
        assert!(instructions.contains("tutor"), "Server instructions should mention 'tutor'");
    }

    #[test]
    fn test_speech_server_startup() {
        let server = SpeechServer::new(test_config());
        let info = server.get_info();

        let instructions = info.instructions.as_ref().unwrap().to_lowercase();
        assert!(instructions.contains("speech"), "Server instructions should mention 'speech'");
    }

    #[test]
    fn test_speech_server_needs_no_gemini_key() {
        let config = Config::from_lookup(|_| None).unwrap();
        let server = SpeechServer::new(config);
        assert!(server.get_info().instructions.is_some());
    }

    #[test]
    fn test_tutor_refuses_to_start_without_key() {
        let config = Config::from_lookup(|name| {
            (name == "SHARED_SECRET").then(|| "test-secret".to_string())
        })
        .unwrap();

        let err = TutorServer::new(config).err().expect("tutor must not start");
        assert!(matches!(
            err,
            lesson_helper_common::Error::Config(ConfigError::MissingEnvVar(ref name)) if name == "GEMINI_KEY"
        ));
    }

    #[test]
    fn test_all_servers_have_tools_capability() {
        let tutor = TutorServer::new(test_config()).unwrap();
        assert!(tutor.get_info().capabilities.tools.is_some());

        let speech = SpeechServer::new(test_config());
        assert!(speech.get_info().capabilities.tools.is_some());
    }

    #[test]
    fn test_no_server_offers_resources() {
        let tutor = TutorServer::new(test_config()).unwrap();
        assert!(tutor.get_info().capabilities.resources.is_none());

        let speech = SpeechServer::new(test_config());
        assert!(speech.get_info().capabilities.resources.is_none());
    }
}
