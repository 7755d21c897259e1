// ABOUTME: Deploy request with centralized CLI flag construction.
// ABOUTME: Create and update share one arg builder so the branches cannot diverge.

use crate::types::{ImageRef, ServiceName};

/// Everything one deploy call needs, independent of the create/update branch.
///
/// Flag construction lives here and only here. The update path reuses the
/// exact flag set of the create path minus the one-time flags, so both
/// branches always carry the same image reference, limits, and env map.
#[derive(Debug, Clone)]
pub struct DeployRequest {
    pub service: ServiceName,
    pub image: ImageRef,
    pub region: String,
    pub memory: String,
    pub cpu: String,
    pub port: u16,
    pub max_instances: u32,
    pub concurrency: u32,
    /// Sorted key/value pairs injected into the service environment.
    pub env: Vec<(String, String)>,
    /// True when the service does not exist yet and one-time flags apply.
    pub create: bool,
}

impl DeployRequest {
    /// CLI arguments for `run deploy`, identical for create and update apart
    /// from the create-only flags.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "run".to_string(),
            "deploy".to_string(),
            self.service.to_string(),
            "--image".to_string(),
            self.image.to_string(),
            "--region".to_string(),
            self.region.clone(),
            "--platform".to_string(),
            "managed".to_string(),
            "--memory".to_string(),
            self.memory.clone(),
            "--cpu".to_string(),
            self.cpu.clone(),
            "--port".to_string(),
            self.port.to_string(),
            "--quiet".to_string(),
        ];

        if self.create {
            args.push("--allow-unauthenticated".to_string());
            args.push("--concurrency".to_string());
            args.push(self.concurrency.to_string());
            args.push("--max-instances".to_string());
            args.push(self.max_instances.to_string());
        }

        for (key, value) in &self.env {
            args.push("--set-env-vars".to_string());
            args.push(format!("{}={}", key, value));
        }

        args
    }

    /// The same arguments with env-var values replaced by a placeholder,
    /// safe for logs and debug output.
    pub fn to_redacted_args(&self) -> Vec<String> {
        let mut args = self.to_args();
        let mut redact_next = false;
        for arg in &mut args {
            if redact_next {
                let key = arg.split('=').next().unwrap_or("").to_string();
                *arg = format!("{}=***", key);
                redact_next = false;
            } else if arg == "--set-env-vars" {
                redact_next = true;
            }
        }
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(create: bool) -> DeployRequest {
        DeployRequest {
            service: ServiceName::new("my-app").unwrap(),
            image: ImageRef::parse("gcr.io/proj/my-app:latest").unwrap(),
            region: "us-central1".to_string(),
            memory: "512Mi".to_string(),
            cpu: "1".to_string(),
            port: 8501,
            max_instances: 5,
            concurrency: 80,
            env: vec![
                ("ADMIN_PASSWORD".to_string(), "s3cret".to_string()),
                ("DEBUG".to_string(), "false".to_string()),
            ],
            create,
        }
    }

    #[test]
    fn create_carries_one_time_flags() {
        let args = request(true).to_args();
        assert!(args.contains(&"--allow-unauthenticated".to_string()));
        let max_idx = args.iter().position(|a| a == "--max-instances").unwrap();
        assert_eq!(args[max_idx + 1], "5");
    }

    #[test]
    fn update_omits_one_time_flags_only() {
        let create_args = request(true).to_args();
        let update_args = request(false).to_args();

        assert!(!update_args.contains(&"--allow-unauthenticated".to_string()));
        assert!(!update_args.contains(&"--max-instances".to_string()));
        assert!(!update_args.contains(&"--concurrency".to_string()));

        // Everything else, including the env set, is identical.
        let strip_one_time = |args: &[String]| -> Vec<String> {
            let mut out = Vec::new();
            let mut skip_value = false;
            for a in args {
                if skip_value {
                    skip_value = false;
                    continue;
                }
                match a.as_str() {
                    "--allow-unauthenticated" => {}
                    "--concurrency" | "--max-instances" => skip_value = true,
                    _ => out.push(a.clone()),
                }
            }
            out
        };
        assert_eq!(strip_one_time(&create_args), update_args);
    }

    #[test]
    fn both_branches_receive_identical_env_set() {
        let pick_env = |args: &[String]| -> Vec<String> {
            args.iter()
                .enumerate()
                .filter(|(_, a)| *a == "--set-env-vars")
                .map(|(i, _)| args[i + 1].clone())
                .collect()
        };

        assert_eq!(pick_env(&request(true).to_args()), pick_env(&request(false).to_args()));
    }

    #[test]
    fn redacted_args_hide_env_values_but_keep_keys() {
        let args = request(true).to_redacted_args();
        assert!(args.contains(&"ADMIN_PASSWORD=***".to_string()));
        assert!(!args.iter().any(|a| a.contains("s3cret")));
    }

    #[test]
    fn platform_and_region_are_always_present() {
        for create in [true, false] {
            let args = request(create).to_args();
            let platform_idx = args.iter().position(|a| a == "--platform").unwrap();
            assert_eq!(args[platform_idx + 1], "managed");
            let region_idx = args.iter().position(|a| a == "--region").unwrap();
            assert_eq!(args[region_idx + 1], "us-central1");
        }
    }
}
