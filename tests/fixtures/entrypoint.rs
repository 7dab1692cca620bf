// @generated by triggerkit 0.1.0. Do not edit by hand.

/// Deployment manifest of this application.
pub const MANIFEST: &str = r#"version: 1
functions:
- name: hello
  trigger: http
  route: /http/hello
  description: Says hello.
  config:
    min_instances: 0
    max_instances: 100
    memory_mb: 256
    timeout_secs: 30
- name: on_order
  trigger: message_queue
  route: /queue/on_order
  config:
    min_instances: 0
    max_instances: 3
    memory_mb: 256
    timeout_secs: 30
    topic: orders
"#;

pub const MANIFEST_CONTENT_TYPE: &str = "application/yaml";

/// Routes every discovered function by trigger kind and name.
pub fn app() -> ::triggerkit::runtime::Application {
    ::triggerkit::runtime::Application::builder()
        .http("hello", crate::hello)
        .message_queue("on_order", "orders", crate::on_order)
        .build()
}

/// Answers every request with [`MANIFEST`].
pub fn manifest_app() -> ::triggerkit::runtime::ManifestApp {
    ::triggerkit::runtime::ManifestApp::new(MANIFEST, MANIFEST_CONTENT_TYPE)
}
