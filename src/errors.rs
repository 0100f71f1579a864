/// User-facing rendition of a collaborator error: short title, plain-language
/// message, actionable suggestion. Raw errors never reach the screen verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub title: String,
    pub message: String,
    pub suggestion: String,
}

pub fn classify_error(raw: &str) -> ErrorInfo {
    let lower = raw.to_ascii_lowercase();

    if lower.contains("passphrase") {
        return ErrorInfo {
            title: "Passphrase Required".to_string(),
            message: "The SSH private key is encrypted and requires a passphrase.".to_string(),
            suggestion: "Enter the passphrase when prompted, or add the key to ssh-agent:\n  ssh-add ~/.ssh/id_ed25519".to_string(),
        };
    }

    if lower.contains("connection refused") {
        return ErrorInfo {
            title: "Connection Refused".to_string(),
            message: "Unable to connect to the remote endpoint.".to_string(),
            suggestion: "Check that:\n  - the address is correct\n  - the service is running on the target\n  - no firewall is blocking the connection".to_string(),
        };
    }

    if lower.contains("no route to host") {
        return ErrorInfo {
            title: "Network Unreachable".to_string(),
            message: "Cannot reach the remote host.".to_string(),
            suggestion: "Check that:\n  - the host is online and reachable\n  - your network connection is working\n  - VPN is connected (if required)".to_string(),
        };
    }

    if lower.contains("timed out") || lower.contains("timeout") || lower.contains("deadline exceeded") {
        return ErrorInfo {
            title: "Timeout".to_string(),
            message: "The operation took too long to complete.".to_string(),
            suggestion: "The endpoint may be under load or unreachable.\nTry again in a few moments.".to_string(),
        };
    }

    if lower.contains("unable to authenticate") || lower.contains("handshake failed") || lower.contains("authentication failed") {
        return ErrorInfo {
            title: "Authentication Failed".to_string(),
            message: "The remote host rejected the SSH credentials.".to_string(),
            suggestion: "Check that:\n  - the username is correct\n  - the key is authorized on the server\n  - the key file path is correct".to_string(),
        };
    }

    if lower.contains("no such host") || lower.contains("dns") || lower.contains("lookup") {
        return ErrorInfo {
            title: "Host Not Found".to_string(),
            message: "The hostname could not be resolved.".to_string(),
            suggestion: "Check that:\n  - the hostname is spelled correctly\n  - DNS is working\n  - try an IP address instead".to_string(),
        };
    }

    if lower.contains("kubeconfig") || lower.contains("couldn't get current server") {
        return ErrorInfo {
            title: "Kubeconfig Error".to_string(),
            message: "Unable to load or use the kubeconfig file.".to_string(),
            suggestion: "Check that:\n  - the kubeconfig file exists and is readable\n  - the file is valid YAML\n  - the cluster context is correct".to_string(),
        };
    }

    if lower.contains("certificate") || lower.contains("x509") {
        return ErrorInfo {
            title: "Certificate Error".to_string(),
            message: "There was a problem with the TLS certificate.".to_string(),
            suggestion: "Check that:\n  - the cluster certificates are valid\n  - the system time is correct\n  - the CA certificate is trusted".to_string(),
        };
    }

    if lower.contains("unauthorized") || lower.contains("forbidden") {
        return ErrorInfo {
            title: "Access Denied".to_string(),
            message: "You don't have permission to perform this action.".to_string(),
            suggestion: "Check that:\n  - your credentials are valid\n  - you have the required RBAC permissions\n  - the token hasn't expired".to_string(),
        };
    }

    if lower.contains("crictl") {
        if lower.contains("permission denied") {
            return ErrorInfo {
                title: "Permission Denied".to_string(),
                message: "crictl requires elevated privileges on the node.".to_string(),
                suggestion: "The remote user needs sudo access for crictl.\nCheck the sudoers configuration on the node.".to_string(),
            };
        }
        if lower.contains("command not found") || lower.contains("not found") {
            return ErrorInfo {
                title: "crictl Not Found".to_string(),
                message: "crictl is not installed on the remote host.".to_string(),
                suggestion: "Install crictl on the node (k3s ships it at /usr/local/bin/crictl).".to_string(),
            };
        }
    }

    if lower.contains("not found") {
        return ErrorInfo {
            title: "Resource Not Found".to_string(),
            message: "The requested resource does not exist.".to_string(),
            suggestion: "It may have been deleted in the meantime.\nRefresh the view with 'r'.".to_string(),
        };
    }

    ErrorInfo {
        title: "Error".to_string(),
        message: truncate(raw, 200),
        suggestion: "Press 'r' to retry or 'esc' to go back.".to_string(),
    }
}

/// Render the first few causes of an anyhow chain on separate lines.
pub fn compact_error(error: &anyhow::Error) -> String {
    let mut out = Vec::new();
    for (index, cause) in error.chain().enumerate() {
        if index == 0 {
            out.push(cause.to_string());
        } else if index <= 2 {
            out.push(format!("caused by: {cause}"));
        } else {
            break;
        }
    }
    out.join("\n")
}

pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{cut}\u{2026}")
}

#[cfg(test)]
mod tests {
    use super::{classify_error, compact_error, truncate};

    #[test]
    fn refused_connections_are_classified() {
        let info = classify_error("dial tcp 10.0.0.1:6443: connection refused");
        assert_eq!(info.title, "Connection Refused");
    }

    #[test]
    fn rbac_failures_are_classified() {
        let info = classify_error("pods is forbidden: User \"x\" cannot list");
        assert_eq!(info.title, "Access Denied");
    }

    #[test]
    fn certificate_problems_are_classified() {
        let info = classify_error("x509: certificate signed by unknown authority");
        assert_eq!(info.title, "Certificate Error");
    }

    #[test]
    fn crictl_permission_beats_generic_not_found() {
        let info = classify_error("crictl ps: permission denied");
        assert_eq!(info.title, "Permission Denied");
        let info = classify_error("crictl: command not found");
        assert_eq!(info.title, "crictl Not Found");
    }

    #[test]
    fn unknown_errors_fall_back_to_truncated_raw() {
        let raw = "z".repeat(400);
        let info = classify_error(&raw);
        assert_eq!(info.title, "Error");
        assert!(info.message.chars().count() <= 200);
    }

    #[test]
    fn compact_error_limits_cause_chain() {
        let error = anyhow::anyhow!("root")
            .context("middle")
            .context("outer");
        let rendered = compact_error(&error);
        assert!(rendered.contains("outer"));
        assert!(rendered.contains("caused by: root"));
    }

    #[test]
    fn truncate_is_char_safe() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 4).chars().count(), 4);
    }
}
