//! Bootstrap script for the lab instance
//!
//! Supplied as instance user data and executed once at first boot by the
//! instance's own init system. Its exit status never feeds back into the
//! provisioning run.

/// Installs the container runtime and Java toolchain, then prepares the lab
/// working directory.
pub const BOOTSTRAP_SCRIPT: &str = r#"#!/bin/bash
# Install Docker
sudo dnf update -y
sudo dnf install -y docker
sudo systemctl enable docker
sudo systemctl start docker
sudo usermod -aG docker ec2-user

# Install Docker Compose
sudo curl -L "https://github.com/docker/compose/releases/latest/download/docker-compose-$(uname -s)-$(uname -m)" -o /usr/local/bin/docker-compose
sudo chmod +x /usr/local/bin/docker-compose

# Install Java 11
sudo dnf install -y java-11-amazon-corretto-devel

# Install Git
sudo dnf install -y git

# Create directory for Flink
mkdir -p /home/ec2-user/flink-ddb-lab
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_is_a_shell_script() {
        assert!(BOOTSTRAP_SCRIPT.starts_with("#!/bin/bash"));
    }

    #[test]
    fn script_installs_runtimes_and_workdir() {
        assert!(BOOTSTRAP_SCRIPT.contains("dnf install -y docker"));
        assert!(BOOTSTRAP_SCRIPT.contains("docker-compose"));
        assert!(BOOTSTRAP_SCRIPT.contains("java-11-amazon-corretto-devel"));
        assert!(BOOTSTRAP_SCRIPT.contains("mkdir -p /home/ec2-user/flink-ddb-lab"));
    }
}
