//! Shared constants for end-to-end tests

// ============================================================================
// Policy engine paths
// ============================================================================

pub const LIST_ALL_PATH: &str = "/policy/api/v1/policytypes";

pub const TCA_MODEL_PATH: &str =
    "/policy/api/v1/policytypes/onap.policies.monitoring.tcagen2/versions/1.0.0";

pub const OPERATIONAL_MODEL_PATH: &str =
    "/policy/api/v1/policytypes/onap.policies.controlloop.operational.common.Drools/versions/1.0.0";

// ============================================================================
// Policy types listed by LIST_ALL_DOCUMENT
// ============================================================================

pub const TCA_TYPE: &str = "onap.policies.monitoring.tcagen2";

pub const OPERATIONAL_TYPE: &str = "onap.policies.controlloop.operational.common.Drools";

pub const MODEL_VERSION: &str = "1.0.0";

// ============================================================================
// Documents
// ============================================================================

/// Answer of the "list all policy types" route, two policy types.
pub const LIST_ALL_DOCUMENT: &str = r#"tosca_definitions_version: tosca_simple_yaml_1_1_0
policy_types:
  - onap.policies.monitoring.tcagen2:
      version: 1.0.0
      description: TCA policy type definition
  - onap.policies.controlloop.operational.common.Drools:
      version: 1.0.0
      description: Operational policies for Drools PDP
"#;

pub const TCA_MODEL: &str = r#"tosca_definitions_version: tosca_simple_yaml_1_1_0
policy_types:
  onap.policies.monitoring.tcagen2:
    derived_from: onap.policies.Monitoring
    version: 1.0.0
    name: onap.policies.monitoring.tcagen2
"#;

pub const OPERATIONAL_MODEL: &str = r#"tosca_definitions_version: tosca_simple_yaml_1_1_0
policy_types:
  onap.policies.controlloop.operational.common.Drools:
    derived_from: onap.policies.controlloop.operational.Common
    version: 1.0.0
    name: onap.policies.controlloop.operational.common.Drools
"#;

// ============================================================================
// Credentials
// ============================================================================

pub const POLICY_USER: &str = "healthcheck";

pub const POLICY_PASSWORD: &str = "zb!XztG34";

/// `Authorization` header value for POLICY_USER / POLICY_PASSWORD.
pub const POLICY_BASIC_AUTH: &str = "Basic aGVhbHRoY2hlY2s6emIhWHp0RzM0";
