use super::*;
use crate::model::{DependencyNotation, DistributionFormat, Scope};

const FULL: &str = r#"
project "control-plane" version="0.1.0"

catalog "gradle/libs.versions.toml"

variables {
    REGISTRY "ghcr.io/acme"
}

repositories {
    local "/opt/m2"
    maven "https://repo.example.com/maven2/"
    maven-central
}

dependencies {
    runtime-only "libs.edc.bom.controlplane" "org.eclipse.edc:iam-mock:0.7.0"
    implementation "libs.edc.spi.boot"
}

application {
    main-class "org.eclipse.edc.boot.system.runtime.BaseRuntime"
    output "build/classes/java/main"
    output "build/resources/main"
}

shadow {
    archive-name "control-plane.jar"
    merge-service-files #true
    merge "META-INF/spring.factories"
    exclude "module-info.class"
    depends-on "dist-tar" "dist-zip"
}

distribution {
    formats "tar" "zip"
}

docker {
    dockerfile "src/main/docker/Dockerfile"
    context "."
    image "{REGISTRY}/control-plane:edge"
    build-arg "OTEL_VERSION" "1.32.0"
    build-arg "MODE=prod"
    platform "linux/arm64"
}
"#;

#[test]
fn test_parse_full_project() {
    let project = parse_kdl_string(FULL, PathBuf::from("/work")).unwrap();

    assert_eq!(project.name, "control-plane");
    assert_eq!(project.version, "0.1.0");
    assert_eq!(project.root, PathBuf::from("/work"));
    assert_eq!(
        project.catalog_path(),
        Some(PathBuf::from("/work/gradle/libs.versions.toml"))
    );
    assert_eq!(project.variables["REGISTRY"], "ghcr.io/acme");
}

#[test]
fn test_parse_repositories() {
    let project = parse_kdl_string(FULL, PathBuf::from("/work")).unwrap();

    assert_eq!(
        project.repositories,
        vec![
            Repository::Local(PathBuf::from("/opt/m2")),
            Repository::Maven("https://repo.example.com/maven2".to_string()),
            Repository::Maven(MAVEN_CENTRAL.to_string()),
        ]
    );
}

#[test]
fn test_parse_dependencies_keep_declaration_order() {
    let project = parse_kdl_string(FULL, PathBuf::from("/work")).unwrap();
    let deps = &project.dependencies;

    assert_eq!(deps.len(), 3);
    assert_eq!(
        deps[0].notation,
        DependencyNotation::Alias("libs.edc.bom.controlplane".to_string())
    );
    assert_eq!(deps[0].scope, Scope::RuntimeOnly);
    assert!(matches!(deps[1].notation, DependencyNotation::Coordinate(_)));
    assert_eq!(deps[1].scope, Scope::RuntimeOnly);
    assert_eq!(deps[2].scope, Scope::Implementation);
}

#[test]
fn test_parse_application_and_shadow() {
    let project = parse_kdl_string(FULL, PathBuf::from("/work")).unwrap();

    assert_eq!(
        project.application.main_class.as_deref(),
        Some("org.eclipse.edc.boot.system.runtime.BaseRuntime")
    );
    assert_eq!(project.application.outputs.len(), 2);
    assert_eq!(project.archive_name(), "control-plane.jar");
    assert!(project.shadow.merge_service_files);
    assert_eq!(project.shadow.merge, vec!["META-INF/spring.factories"]);
    assert_eq!(project.shadow.exclude, vec!["module-info.class"]);
    assert_eq!(
        project.shadow.depends_on,
        Some(vec!["dist-tar".to_string(), "dist-zip".to_string()])
    );
}

#[test]
fn test_parse_docker() {
    let project = parse_kdl_string(FULL, PathBuf::from("/work")).unwrap();
    let docker = &project.docker;

    assert_eq!(
        project.dockerfile_path(),
        PathBuf::from("/work/src/main/docker/Dockerfile")
    );
    assert_eq!(docker.build_args["OTEL_VERSION"], "1.32.0");
    assert_eq!(docker.build_args["MODE"], "prod");
    assert_eq!(docker.platform.as_ref().unwrap().as_str(), "linux/arm64");
    assert!(!docker.pull);
    assert_eq!(
        project.image_tags().unwrap().to_strings(),
        vec![
            "control-plane:0.1.0",
            "control-plane:latest",
            "ghcr.io/acme/control-plane:edge",
        ]
    );
}

#[test]
fn test_parse_docker_pull() {
    let kdl = r#"
        project "control-plane" "1.2.3"
        docker {
            pull
        }
    "#;
    let project = parse_kdl_string(kdl, PathBuf::from("/work")).unwrap();
    assert!(project.docker.pull);

    let kdl = r#"
        project "control-plane" "1.2.3"
        docker {
            pull #false
        }
    "#;
    let project = parse_kdl_string(kdl, PathBuf::from("/work")).unwrap();
    assert!(!project.docker.pull);
}

#[test]
fn test_minimal_project_uses_defaults() {
    let kdl = r#"
        project "control-plane" "1.2.3"
    "#;

    let project = parse_kdl_string(kdl, PathBuf::from("/work")).unwrap();
    assert_eq!(project.version, "1.2.3");
    assert!(project.dependencies.is_empty());
    assert!(project.shadow.merge_service_files);
    assert_eq!(
        project.distribution.formats,
        vec![DistributionFormat::Tar, DistributionFormat::Zip]
    );
    assert!(project.docker.platform.is_none());
    assert_eq!(project.archive_name(), "control-plane.jar");
}

#[test]
fn test_missing_project_node() {
    let err = parse_kdl_string("dependencies {}", PathBuf::from("/work")).unwrap_err();
    assert!(matches!(err, ProjectError::InvalidConfig(_)));
}

#[test]
fn test_missing_version() {
    let err = parse_kdl_string(r#"project "a""#, PathBuf::from("/work")).unwrap_err();
    assert!(matches!(err, ProjectError::InvalidConfig(_)));
}

#[test]
fn test_unknown_scope() {
    let kdl = r#"
        project "a" version="1"
        dependencies {
            api "g:a:1"
        }
    "#;
    let err = parse_kdl_string(kdl, PathBuf::from("/work")).unwrap_err();
    assert!(matches!(err, ProjectError::InvalidConfig(_)));
}

#[test]
fn test_invalid_coordinate_in_dependencies() {
    let kdl = r#"
        project "a" version="1"
        dependencies {
            implementation "g:a"
        }
    "#;
    let err = parse_kdl_string(kdl, PathBuf::from("/work")).unwrap_err();
    assert!(matches!(err, ProjectError::InvalidCoordinate(_)));
}

#[test]
fn test_invalid_platform() {
    let kdl = r#"
        project "a" version="1"
        docker {
            platform "arm64"
        }
    "#;
    let err = parse_kdl_string(kdl, PathBuf::from("/work")).unwrap_err();
    assert!(matches!(err, ProjectError::InvalidPlatform(_)));
}

#[test]
fn test_disable_distributions_and_service_merge() {
    let kdl = r#"
        project "a" version="1"
        shadow {
            merge-service-files #false
        }
        distribution {
            formats
        }
    "#;
    let project = parse_kdl_string(kdl, PathBuf::from("/work")).unwrap();
    assert!(!project.shadow.merge_service_files);
    assert!(project.distribution.formats.is_empty());
}

#[test]
fn test_invalid_kdl() {
    let err = parse_kdl_string("project \"a", PathBuf::from("/work")).unwrap_err();
    assert!(matches!(err, ProjectError::KdlParse(_)));
}

#[test]
fn test_parse_kdl_file_in_hidden_dir_uses_parent_as_root() {
    let temp_dir = tempfile::tempdir().unwrap();
    let hidden = temp_dir.path().join(".jarflow");
    std::fs::create_dir(&hidden).unwrap();
    std::fs::write(hidden.join("jarflow.kdl"), r#"project "a" version="1""#).unwrap();

    let project = parse_kdl_file(hidden.join("jarflow.kdl")).unwrap();
    assert_eq!(project.root, temp_dir.path());
}
