use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub session_ttl_hours: i64,
    pub llm_api_url: String,
    pub llm_api_key: String,
    pub llm_model: String,
    pub llm_timeout_secs: u64,
    pub chat_history_limit: i64,
    pub chat_history_ttl_minutes: i64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let session_ttl_hours = env::var("SESSION_TTL_HOURS")
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(24);

        let llm_api_url = env::var("LLM_API_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".to_string());
        let llm_api_key = env::var("LLM_API_KEY").unwrap_or_default();
        let llm_model = env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        let llm_timeout_secs = env::var("LLM_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(30);

        let chat_history_limit = env::var("CHAT_HISTORY_LIMIT")
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(10);
        let chat_history_ttl_minutes = env::var("CHAT_HISTORY_TTL_MINUTES")
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(60);

        Ok(Self {
            database_url,
            bind_addr,
            session_ttl_hours,
            llm_api_url,
            llm_api_key,
            llm_model,
            llm_timeout_secs,
            chat_history_limit,
            chat_history_ttl_minutes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn llm_model_defaults_and_overrides() {
        // Env mutation is process-global; keep it inside one test so nothing
        // races on the variables.
        unsafe {
            env::set_var("DATABASE_URL", "postgres://localhost/mindcare_test");
            env::remove_var("LLM_MODEL");
        }
        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.llm_model, "gpt-4o-mini");

        unsafe {
            env::set_var("LLM_MODEL", "gpt-4.1");
        }
        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.llm_model, "gpt-4.1");
    }
}
