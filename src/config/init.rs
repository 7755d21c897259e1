// ABOUTME: Config file initialization for `caravel init`.
// ABOUTME: Writes a commented caravel.yml template into the project directory.

use super::CONFIG_FILENAME;
use crate::error::{Error, Result};
use crate::types::{ImageRef, ServiceName};
use std::path::Path;

pub fn init_config(
    dir: &Path,
    service: Option<&str>,
    image: Option<&str>,
    force: bool,
) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let service = match service {
        Some(s) => ServiceName::new(s).map_err(|e| Error::InvalidConfig(e.to_string()))?,
        None => ServiceName::new("my-app").expect("default name is valid"),
    };

    let image = match image {
        Some(i) => Some(ImageRef::parse(i).map_err(|e| Error::InvalidConfig(e.to_string()))?),
        None => None,
    };

    let yaml = generate_template_yaml(&service, image.as_ref());
    std::fs::write(&config_path, yaml)?;

    Ok(())
}

fn generate_template_yaml(service: &ServiceName, image: Option<&ImageRef>) -> String {
    let image_line = match image {
        Some(i) => format!("image: {}\n", i.name()),
        None => String::new(),
    };
    format!(
        r#"service: {service}
{image_line}channel: latest
registry: gcr.io
# project: my-project        # resolved from the cloud CLI when unset
region: us-central1
port: 8501

env:
  OPENAI_API_KEY:
    env: OPENAI_API_KEY
  ADMIN_PASSWORD:
    env: ADMIN_PASSWORD
    default: admin123

resources:
  memory: 512Mi
  cpu: "1"
  max_instances: 5
  concurrency: 80

health:
  path: /_stcore/health
  probe_timeout: 5s
  deadline: 60s

verify:
  # smoke_command: ["python", "-c", "import app"]
  settle: 10s

# severity:
#   smoke_test: warn
#   start_probe: warn
#   health_probe: warn

# assets:
#   bucket: my-embeddings-bucket
#   source: static_embeddings
"#
    )
}
