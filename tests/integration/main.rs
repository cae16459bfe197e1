//! Integration tests for tinyforge

mod fixtures {
    use std::path::PathBuf;
    use tempfile::TempDir;
    use tinyforge::artifact::{write_jar, MAPPINGS_FILE_PATH};
    use tinyforge::context::BuildContext;
    use tinyforge::orchestrator::Orchestrator;
    use tinyforge::provider::{IntermediateMappingsProvider, MappingsProvider};
    use tinyforge::store::TableStore;

    pub const PLATFORM: &str = "1.17.1";

    /// Intermediate table leading with the source namespace
    pub const INTER_A: &str = "tiny\t2\t0\tofficial\tintermediary\n\
        c\ta\tnet/minecraft/class_1\n\
        \tf\tI\tb\tfield_1\n";

    /// Intermediate table leading with the join namespace
    pub const INTER_B: &str = "tiny\t2\t0\tintermediary\tofficial\n\
        c\tnet/minecraft/class_2\tc\n";

    /// Intermediate table without the source namespace
    pub const INTER_NO_SOURCE: &str = "tiny\t2\t0\tintermediary\thashed\n\
        c\tnet/minecraft/class_1\tC_1\n";

    pub const INTER_V1: &str = "v1\tofficial\tintermediary\nCLASS\ta\tnet/minecraft/class_1\n";

    /// Unmerged v2 mappings on the join namespace
    pub const YARN_V2: &str = "tiny\t2\t0\tintermediary\tnamed\n\
        c\tnet/minecraft/class_1\tcom/example/Block\n";

    /// Already merged legacy mappings
    pub const YARN_V1: &str =
        "v1\tofficial\tintermediary\tnamed\nCLASS\ta\tnet/minecraft/class_1\tcom/example/Block\n";

    pub const INSTALLER: &str =
        r#"{"libraries":{"common":[{"name":"org.ow2.asm:asm:9.1","url":"https://maven.example/"}]}}"#;

    /// A scratch project directory holding artifacts and a table store
    pub struct Project {
        pub temp: TempDir,
    }

    impl Project {
        pub fn new() -> Self {
            Self {
                temp: TempDir::new().unwrap(),
            }
        }

        /// Write a jar carrying `content` as its mapping table
        pub fn table_jar(&self, name: &str, content: &str) -> PathBuf {
            self.jar(name, MAPPINGS_FILE_PATH, content)
        }

        pub fn jar(&self, name: &str, entry: &str, content: &str) -> PathBuf {
            let path = self.temp.path().join(name);
            write_jar(&path, &[(entry, content.as_bytes())]).unwrap();
            path
        }

        pub fn store_root(&self) -> PathBuf {
            self.temp.path().join("store")
        }

        pub fn store(&self) -> TableStore {
            TableStore::new(self.store_root())
        }

        pub fn context(&self) -> BuildContext {
            BuildContext::new(self.store(), PLATFORM)
        }

        /// Orchestrator with both mapping providers registered
        pub fn orchestrator(&self, context: BuildContext) -> Orchestrator {
            let mut orchestrator = Orchestrator::new(context);
            orchestrator
                .register(IntermediateMappingsProvider::new())
                .unwrap();
            orchestrator.register(MappingsProvider::new()).unwrap();
            orchestrator
        }
    }
}

mod pipeline_tests {
    use super::fixtures::*;
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tinyforge::artifact::{ArtifactReader, JarArchive};
    use tinyforge::context::Collaborators;
    use tinyforge::error::{ForgeError, ForgeResult};
    use tinyforge::orchestrator::{DeferredAction, Orchestrator};
    use tinyforge::provider::{
        slots, DependencyProvider, IntermediateMappingsProvider, MappingsProvider,
        ModClasspathProvider, ProvideContext, ProviderRole, SlotBinding,
    };
    use tinyforge::resolver::{ResolvedDependency, StaticResolver};
    use tinyforge::store::TableIdentity;
    use tinyforge::table::{read_table, TableFormat};
    use tinyforge::transform::{JoinMerger, TableMerger};

    fn dep(coordinate: &str, artifact: &Path) -> ResolvedDependency {
        ResolvedDependency::parse(coordinate, artifact).unwrap()
    }

    /// Resolver with one intermediate table and v2 mappings
    fn single_intermediate(project: &Project) -> StaticResolver {
        StaticResolver::new()
            .with(
                slots::INTERMEDIATE_MAPPINGS,
                dep("net.example:inter:1.0", &project.table_jar("inter.jar", INTER_A)),
            )
            .with(
                slots::MAPPINGS,
                dep(
                    "net.example:yarn:1.17.1+build.1:v2",
                    &project.table_jar("yarn.jar", YARN_V2),
                ),
            )
    }

    /// Resolver with two intermediate tables in opposite orders
    fn layered(project: &Project) -> StaticResolver {
        single_intermediate(project).with(
            slots::INTERMEDIATE_MAPPINGS,
            dep("net.example:hashed:1.0", &project.table_jar("hashed.jar", INTER_B)),
        )
    }

    struct CountingReader {
        calls: Arc<AtomicUsize>,
    }

    impl ArtifactReader for CountingReader {
        fn read_entry(
            &self,
            artifact: &Path,
            candidates: &[&str],
        ) -> ForgeResult<Option<(String, Vec<u8>)>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            JarArchive.read_entry(artifact, candidates)
        }
    }

    struct CountingMerger {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl TableMerger for CountingMerger {
        async fn merge(&self, inputs: &[PathBuf], output: &Path) -> ForgeResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            JoinMerger.merge(inputs, output).await
        }
    }

    fn counting(project: &Project) -> (Orchestrator, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let reads = Arc::new(AtomicUsize::new(0));
        let merges = Arc::new(AtomicUsize::new(0));
        let collaborators = Collaborators {
            reader: Arc::new(CountingReader {
                calls: reads.clone(),
            }),
            merger: Arc::new(CountingMerger {
                calls: merges.clone(),
            }),
            ..Collaborators::default()
        };
        let orchestrator = project.orchestrator(project.context().with_collaborators(collaborators));
        (orchestrator, reads, merges)
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let project = Project::new();
        let mut orchestrator = project.orchestrator(project.context());

        let err = orchestrator.register(MappingsProvider::new()).unwrap_err();
        assert!(matches!(err, ForgeError::DuplicateProvider { kind: "mappings" }));
        assert_eq!(orchestrator.registry().len(), 2);
    }

    #[tokio::test]
    async fn run_needs_designated_providers() {
        let project = Project::new();
        let mut orchestrator = Orchestrator::new(project.context());
        orchestrator.register(MappingsProvider::new()).unwrap();

        let err = orchestrator
            .resolve_dependencies(&single_intermediate(&project))
            .await
            .unwrap_err();
        assert!(matches!(err, ForgeError::Configuration(_)));
    }

    #[tokio::test]
    async fn missing_intermediate_dependency_fails_the_slot() {
        let project = Project::new();
        let mut orchestrator = project.orchestrator(project.context());
        let resolver = StaticResolver::new().with(
            slots::MAPPINGS,
            dep("net.example:yarn:1.0:v2", &project.table_jar("yarn.jar", YARN_V2)),
        );

        let err = orchestrator.resolve_dependencies(&resolver).await.unwrap_err();
        assert!(matches!(err, ForgeError::SlotFailed { .. }));
        assert!(matches!(
            err.root_cause(),
            ForgeError::MissingDependency { slot } if slot == slots::INTERMEDIATE_MAPPINGS
        ));
    }

    #[tokio::test]
    async fn single_slot_rejects_second_dependency() {
        let project = Project::new();
        let mut orchestrator = project.orchestrator(project.context());
        let resolver = single_intermediate(&project).with(
            slots::MAPPINGS,
            dep("net.example:other:1.0", &project.table_jar("other.jar", YARN_V2)),
        );

        let err = orchestrator.resolve_dependencies(&resolver).await.unwrap_err();
        assert!(matches!(
            err.root_cause(),
            ForgeError::Multiplicity { slot, count: 2 } if slot == slots::MAPPINGS
        ));
    }

    #[tokio::test]
    async fn single_intermediate_is_copied_verbatim() {
        let project = Project::new();
        let mut orchestrator = project.orchestrator(project.context());

        let report = orchestrator
            .resolve_dependencies(&single_intermediate(&project))
            .await
            .unwrap();

        let intermediate = report
            .canonical
            .iter()
            .find(|t| t.role == ProviderRole::IntermediateMappings)
            .unwrap();
        assert_eq!(std::fs::read_to_string(&intermediate.table).unwrap(), INTER_A);
        assert_eq!(intermediate.identity.name, "inter-1.0");
        assert_eq!(intermediate.identity.version, PLATFORM);
        assert!(intermediate.artifact.exists());
    }

    #[tokio::test]
    async fn layered_intermediates_lead_with_source_namespace() {
        let project = Project::new();
        let mut orchestrator = project.orchestrator(project.context());

        let report = orchestrator
            .resolve_dependencies(&layered(&project))
            .await
            .unwrap();

        let provider = orchestrator
            .registry()
            .lookup::<IntermediateMappingsProvider>()
            .unwrap();
        let recorded: Vec<&str> = provider
            .dependencies()
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(recorded, vec!["inter", "hashed"]);

        let intermediate = orchestrator.outputs().intermediate().unwrap();
        assert_eq!(intermediate.namespaces, vec!["official", "intermediary"]);
        assert_eq!(intermediate.identity.name, "inter-1.0_hashed-1.0");

        let table = intermediate.load().await.unwrap();
        let officials: Vec<&str> = table.classes().iter().filter_map(|c| c.name(0)).collect();
        assert_eq!(officials, vec!["a", "c"]);

        // both dependencies were handed over before the mappings slot ran
        let slots_called: Vec<&str> = report.calls.iter().map(|c| c.slot.as_str()).collect();
        assert_eq!(
            slots_called,
            vec![
                slots::INTERMEDIATE_MAPPINGS,
                slots::INTERMEDIATE_MAPPINGS,
                slots::MAPPINGS
            ]
        );
    }

    #[tokio::test]
    async fn intermediate_without_source_namespace_is_rejected() {
        let project = Project::new();
        let mut orchestrator = project.orchestrator(project.context());
        let resolver = StaticResolver::new()
            .with(
                slots::INTERMEDIATE_MAPPINGS,
                dep(
                    "net.example:hashed:1.0",
                    &project.table_jar("hashed.jar", INTER_NO_SOURCE),
                ),
            )
            .with(
                slots::MAPPINGS,
                dep("net.example:yarn:1.0:v2", &project.table_jar("yarn.jar", YARN_V2)),
            );

        let err = orchestrator.resolve_dependencies(&resolver).await.unwrap_err();
        assert!(matches!(
            err.root_cause(),
            ForgeError::MissingNamespace { namespace, .. } if namespace == "official"
        ));
    }

    #[tokio::test]
    async fn missing_table_writes_no_canonical() {
        let project = Project::new();
        let mut orchestrator = project.orchestrator(project.context());
        let resolver = StaticResolver::new()
            .with(
                slots::INTERMEDIATE_MAPPINGS,
                dep(
                    "net.example:inter:1.0",
                    &project.jar("inter.jar", "readme.txt", "no table here"),
                ),
            )
            .with(
                slots::MAPPINGS,
                dep("net.example:yarn:1.0:v2", &project.table_jar("yarn.jar", YARN_V2)),
            );

        let err = orchestrator.resolve_dependencies(&resolver).await.unwrap_err();
        match err.root_cause() {
            ForgeError::MissingTable { coordinate, .. } => {
                assert_eq!(coordinate, "net.example:inter:1.0")
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(!project.store().canonical_path_for_stem("inter-1.0").exists());
    }

    #[tokio::test]
    async fn mappings_without_table_write_nothing() {
        let project = Project::new();
        let mut orchestrator = project.orchestrator(project.context());
        let yarn = project.jar("yarn.jar", "readme.txt", "no table here");
        let resolver = StaticResolver::new()
            .with(
                slots::INTERMEDIATE_MAPPINGS,
                dep("net.example:inter:1.0", &project.table_jar("inter.jar", INTER_A)),
            )
            .with(slots::MAPPINGS, dep("net.example:yarn:1.0:v2", &yarn));

        let err = orchestrator.resolve_dependencies(&resolver).await.unwrap_err();
        match err.root_cause() {
            ForgeError::MissingTable { coordinate, .. } => {
                assert_eq!(coordinate, "net.example:yarn:1.0:v2")
            }
            other => panic!("unexpected error {:?}", other),
        }

        let store = project.store();
        for format in [TableFormat::V2, TableFormat::V1] {
            let identity = TableIdentity::new(
                "net.example",
                "yarn",
                format!("1.0{}", format.version_suffix()),
            );
            assert!(!store.canonical_path(&identity).exists());
        }
        assert!(!store.packaged_path(&yarn, Some("v2")).exists());
    }

    #[tokio::test]
    async fn empty_mappings_slot_is_missing_dependency() {
        let project = Project::new();
        let mut orchestrator = project.orchestrator(project.context());
        let resolver = StaticResolver::new().with(
            slots::INTERMEDIATE_MAPPINGS,
            dep("net.example:inter:1.0", &project.table_jar("inter.jar", INTER_A)),
        );

        let err = orchestrator.resolve_dependencies(&resolver).await.unwrap_err();
        assert!(matches!(
            err.root_cause(),
            ForgeError::MissingDependency { slot } if slot == slots::MAPPINGS
        ));
    }

    /// Second provider claiming the intermediate role under another kind
    #[derive(Debug, Default)]
    struct ShadowIntermediate;

    #[async_trait]
    impl DependencyProvider for ShadowIntermediate {
        fn kind(&self) -> &'static str {
            "shadow-intermediate"
        }

        fn role(&self) -> ProviderRole {
            ProviderRole::IntermediateMappings
        }

        fn bind_slot(&self) -> SlotBinding {
            SlotBinding::multiple("shadowMappings")
        }

        async fn provide(
            &mut self,
            _dependency: &ResolvedDependency,
            _ctx: &mut ProvideContext<'_>,
        ) -> ForgeResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn two_intermediate_providers_are_rejected() {
        let project = Project::new();
        let mut orchestrator = project.orchestrator(project.context());
        orchestrator.register(ShadowIntermediate).unwrap();

        let err = orchestrator
            .resolve_dependencies(&single_intermediate(&project))
            .await
            .unwrap_err();
        assert!(matches!(err, ForgeError::Configuration(ref msg) if msg.contains("2 intermediate")));
        assert!(store_untouched(&project));
    }

    /// Nothing was written to the store
    fn store_untouched(project: &Project) -> bool {
        !project.store().mappings_dir().exists()
    }

    #[tokio::test]
    async fn unrecognized_mappings_header_fails_detection() {
        let project = Project::new();
        let mut orchestrator = project.orchestrator(project.context());
        let resolver = StaticResolver::new()
            .with(
                slots::INTERMEDIATE_MAPPINGS,
                dep("net.example:inter:1.0", &project.table_jar("inter.jar", INTER_A)),
            )
            .with(
                slots::MAPPINGS,
                dep(
                    "net.example:yarn:1.0:v2",
                    &project.table_jar("yarn.jar", "garbage\tofficial\nc\ta\tb\n"),
                ),
            );

        let err = orchestrator.resolve_dependencies(&resolver).await.unwrap_err();
        assert!(matches!(err, ForgeError::Provide { .. }));
        assert!(matches!(err.root_cause(), ForgeError::FormatDetection { .. }));
    }

    #[tokio::test]
    async fn v1_intermediate_is_unsupported() {
        let project = Project::new();
        let mut orchestrator = project.orchestrator(project.context());
        let resolver = StaticResolver::new()
            .with(
                slots::INTERMEDIATE_MAPPINGS,
                dep("net.example:inter:1.0", &project.table_jar("inter.jar", INTER_V1)),
            )
            .with(
                slots::MAPPINGS,
                dep("net.example:yarn:1.0:v2", &project.table_jar("yarn.jar", YARN_V2)),
            );

        let err = orchestrator.resolve_dependencies(&resolver).await.unwrap_err();
        assert!(matches!(
            err.root_cause(),
            ForgeError::UnsupportedFormat { coordinate } if coordinate == "net.example:inter:1.0"
        ));
        assert!(!project.store().canonical_path_for_stem("inter-1.0").exists());
    }

    #[tokio::test]
    async fn v2_mappings_are_joined_with_intermediate() {
        let project = Project::new();
        let mut orchestrator = project.orchestrator(project.context());

        orchestrator
            .resolve_dependencies(&single_intermediate(&project))
            .await
            .unwrap();

        let provider = orchestrator.registry().lookup::<MappingsProvider>().unwrap();
        assert_eq!(provider.format(), Some(TableFormat::V2));
        let canonical = provider.canonical().unwrap();
        assert_eq!(canonical.identity.name, "net.example.yarn");
        assert_eq!(canonical.identity.version, "1.17.1+build.1-v2");
        assert_eq!(canonical.namespaces, vec!["official", "intermediary", "named"]);

        let table = read_table(&canonical.table).await.unwrap();
        assert_eq!(
            table.classes()[0].names,
            vec!["a", "net/minecraft/class_1", "com/example/Block"]
        );

        // both canonical tables were handed on as packaged artifacts
        let emitted = orchestrator.outputs().emitted(slots::MAPPINGS_FINAL);
        assert_eq!(emitted.len(), 2);
        assert!(emitted.iter().all(|d| d.artifact.exists()));
    }

    #[tokio::test]
    async fn v1_mappings_are_promoted_unchanged() {
        let project = Project::new();
        let mut orchestrator = project.orchestrator(project.context());
        let resolver = StaticResolver::new()
            .with(
                slots::INTERMEDIATE_MAPPINGS,
                dep("net.example:inter:1.0", &project.table_jar("inter.jar", INTER_A)),
            )
            .with(
                slots::MAPPINGS,
                dep(
                    "net.example:legacy:1.0",
                    &project.table_jar("legacy.jar", YARN_V1),
                ),
            );

        orchestrator.resolve_dependencies(&resolver).await.unwrap();

        let provider = orchestrator.registry().lookup::<MappingsProvider>().unwrap();
        assert_eq!(provider.format(), Some(TableFormat::V1));
        let canonical = provider.canonical().unwrap();
        assert_eq!(canonical.identity.version, "1.0");
        assert_eq!(std::fs::read_to_string(&canonical.table).unwrap(), YARN_V1);
    }

    #[tokio::test]
    async fn warm_cache_skips_extraction_and_merging() {
        let project = Project::new();
        let resolver = layered(&project);

        let (mut cold, reads, merges) = counting(&project);
        let first = cold.resolve_dependencies(&resolver).await.unwrap();
        assert_eq!(reads.load(Ordering::SeqCst), 3);
        assert_eq!(merges.load(Ordering::SeqCst), 2);

        let (mut warm, reads, merges) = counting(&project);
        let second = warm.resolve_dependencies(&resolver).await.unwrap();
        assert_eq!(reads.load(Ordering::SeqCst), 0);
        assert_eq!(merges.load(Ordering::SeqCst), 0);

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn refresh_rebuilds_identical_outputs() {
        let project = Project::new();
        let resolver = layered(&project);

        let mut cold = project.orchestrator(project.context());
        let report = cold.resolve_dependencies(&resolver).await.unwrap();
        let before: Vec<(Vec<u8>, Vec<u8>)> = report
            .canonical
            .iter()
            .map(|t| {
                (
                    std::fs::read(&t.table).unwrap(),
                    std::fs::read(&t.artifact).unwrap(),
                )
            })
            .collect();

        let reads = Arc::new(AtomicUsize::new(0));
        let collaborators = Collaborators {
            reader: Arc::new(CountingReader {
                calls: reads.clone(),
            }),
            ..Collaborators::default()
        };
        let mut refreshed = project.orchestrator(
            project
                .context()
                .with_refresh(true)
                .with_collaborators(collaborators),
        );
        let again = refreshed.resolve_dependencies(&resolver).await.unwrap();
        assert_eq!(reads.load(Ordering::SeqCst), 3);

        let after: Vec<(Vec<u8>, Vec<u8>)> = again
            .canonical
            .iter()
            .map(|t| {
                (
                    std::fs::read(&t.table).unwrap(),
                    std::fs::read(&t.artifact).unwrap(),
                )
            })
            .collect();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn steps_are_pruned_after_run() {
        let project = Project::new();
        let mut orchestrator = project.orchestrator(project.context());

        let report = orchestrator
            .resolve_dependencies(&layered(&project))
            .await
            .unwrap();

        assert_eq!(
            report.deferred,
            vec![DeferredAction::PruneSteps {
                dir: project.store().steps_dir()
            }]
        );
        assert!(!project.store().steps_dir().exists());
    }

    #[tokio::test]
    async fn installer_metadata_is_discovered_from_classpath() {
        let project = Project::new();
        let mut orchestrator = project.orchestrator(project.context());
        orchestrator.register(ModClasspathProvider::new()).unwrap();

        let resolver = single_intermediate(&project)
            .with(
                slots::MOD_COMPILE_CLASSPATH,
                dep(
                    "net.example:library:2.0",
                    &project.jar("library.jar", "library.txt", "plain library"),
                ),
            )
            .with(
                slots::MOD_COMPILE_CLASSPATH,
                dep(
                    "net.fabricmc:fabric-loader:0.11.6",
                    &project.jar("loader.jar", "fabric-installer.json", INSTALLER),
                ),
            );

        let report = orchestrator.resolve_dependencies(&resolver).await.unwrap();

        let installer = orchestrator.context().installer().unwrap();
        assert_eq!(installer.version, "0.11.6");
        assert_eq!(installer.libraries.len(), 1);
        assert_eq!(installer.libraries[0].name, "org.ow2.asm:asm:9.1");

        let classpath = orchestrator
            .registry()
            .lookup::<ModClasspathProvider>()
            .unwrap();
        assert_eq!(classpath.coordinates().len(), 2);

        // discovery is scheduled once, after the pruning scheduled by finalize
        assert_eq!(
            report.deferred.last(),
            Some(&DeferredAction::DiscoverInstaller {
                slot: slots::MOD_COMPILE_CLASSPATH.to_string()
            })
        );
        assert_eq!(report.deferred.len(), 2);
    }

    #[tokio::test]
    async fn repeated_runs_on_one_orchestrator_agree() {
        let project = Project::new();
        let mut orchestrator = project.orchestrator(project.context());
        orchestrator.register(ModClasspathProvider::new()).unwrap();
        let resolver = single_intermediate(&project).with(
            slots::MOD_COMPILE_CLASSPATH,
            dep(
                "net.fabricmc:fabric-loader:0.11.6",
                &project.jar("loader.jar", "fabric-installer.json", INSTALLER),
            ),
        );

        let first = orchestrator.resolve_dependencies(&resolver).await.unwrap();
        let second = orchestrator.resolve_dependencies(&resolver).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(second.deferred.len(), 2);
        assert_eq!(
            orchestrator.outputs().intermediate().unwrap().identity.name,
            "inter-1.0"
        );

        let provider = orchestrator
            .registry()
            .lookup::<IntermediateMappingsProvider>()
            .unwrap();
        assert_eq!(provider.dependencies().len(), 1);
        let classpath = orchestrator
            .registry()
            .lookup::<ModClasspathProvider>()
            .unwrap();
        assert_eq!(classpath.coordinates().len(), 1);
        assert!(orchestrator.context().installer().is_some());
    }

    #[tokio::test]
    async fn reports_are_deterministic() {
        let first = {
            let project = Project::new();
            let mut orchestrator = project.orchestrator(project.context());
            let report = orchestrator
                .resolve_dependencies(&layered(&project))
                .await
                .unwrap();
            report.calls
        };
        let second = {
            let project = Project::new();
            let mut orchestrator = project.orchestrator(project.context());
            let report = orchestrator
                .resolve_dependencies(&layered(&project))
                .await
                .unwrap();
            report.calls
        };

        assert_eq!(first, second);
        assert!(first
            .iter()
            .any(|c| c.provider == "intermediate-mappings" && c.coordinate == "net.example:hashed:1.0"));
    }
}

mod cli_tests {
    use super::fixtures::*;
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use tempfile::TempDir;

    /// Command isolated from any user configuration
    fn tinyforge(temp: &TempDir) -> Command {
        let mut cmd = cargo_bin_cmd!("tinyforge");
        cmd.arg("--config")
            .arg(temp.path().join("config.toml"))
            .env_remove("TINYFORGE_CACHE_DIR");
        cmd
    }

    fn write_manifest(project: &Project) -> std::path::PathBuf {
        project.table_jar("inter.jar", INTER_A);
        project.table_jar("yarn.jar", YARN_V2);
        let manifest = project.temp.path().join("tinyforge.toml");
        fs::write(
            &manifest,
            format!(
                r#"platform_version = "{}"

[[dependency]]
slot = "intermediateMappings"
coordinate = "net.example:inter:1.0"
artifact = "inter.jar"

[[dependency]]
slot = "mappings"
coordinate = "net.example:yarn:1.17.1+build.1:v2"
artifact = "yarn.jar"
"#,
                PLATFORM
            ),
        )
        .unwrap();
        manifest
    }

    #[test]
    fn help_displays() {
        let temp = TempDir::new().unwrap();
        tinyforge(&temp)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("layered mapping table pipeline"));
    }

    #[test]
    fn version_displays() {
        let temp = TempDir::new().unwrap();
        tinyforge(&temp)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("tinyforge"));
    }

    #[test]
    fn config_path_follows_flag() {
        let temp = TempDir::new().unwrap();
        tinyforge(&temp)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show_prints_defaults() {
        let temp = TempDir::new().unwrap();
        tinyforge(&temp)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[namespaces]"))
            .stdout(predicate::str::contains("official"));
    }

    #[test]
    fn config_init_writes_file() {
        let temp = TempDir::new().unwrap();
        tinyforge(&temp).args(["config", "init"]).assert().success();
        assert!(temp.path().join("config.toml").exists());
    }

    #[test]
    fn cache_path_uses_flag() {
        let temp = TempDir::new().unwrap();
        let store = temp.path().join("store");
        tinyforge(&temp)
            .args(["cache", "path", "--cache-dir"])
            .arg(&store)
            .assert()
            .success()
            .stdout(predicate::str::contains("store"));
    }

    #[test]
    fn cache_list_on_empty_store() {
        let temp = TempDir::new().unwrap();
        tinyforge(&temp)
            .args(["cache", "list", "--cache-dir"])
            .arg(temp.path().join("store"))
            .assert()
            .success()
            .stdout(predicate::str::contains("No cached tables"));
    }

    #[test]
    fn run_without_manifest_fails() {
        let temp = TempDir::new().unwrap();
        tinyforge(&temp)
            .args(["run", "--manifest"])
            .arg(temp.path().join("missing.toml"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("Error:"));
    }

    #[test]
    fn run_prints_json_report() {
        let project = Project::new();
        let manifest = write_manifest(&project);
        tinyforge(&project.temp)
            .args(["run", "--json", "--manifest"])
            .arg(&manifest)
            .arg("--cache-dir")
            .arg(project.store_root())
            .assert()
            .success()
            .stdout(predicate::str::contains("\"canonical\""))
            .stdout(predicate::str::contains("intermediate_mappings"));

        assert!(project
            .store()
            .canonical_path_for_stem("inter-1.0")
            .exists());
    }

    #[test]
    fn namespaces_respects_exclusions() {
        let project = Project::new();
        let manifest = write_manifest(&project);
        tinyforge(&project.temp)
            .args(["namespaces", "--except", "official", "--manifest"])
            .arg(&manifest)
            .arg("--cache-dir")
            .arg(project.store_root())
            .assert()
            .success()
            .stdout(predicate::eq("intermediary\n"));
    }

    #[test]
    fn cache_clean_removes_tables() {
        let project = Project::new();
        let manifest = write_manifest(&project);
        tinyforge(&project.temp)
            .args(["run", "--json", "--manifest"])
            .arg(&manifest)
            .arg("--cache-dir")
            .arg(project.store_root())
            .assert()
            .success();

        tinyforge(&project.temp)
            .args(["cache", "clean", "--yes", "--cache-dir"])
            .arg(project.store_root())
            .assert()
            .success();
        assert!(!project.store().mappings_dir().exists());
    }

    #[test]
    fn reorder_moves_namespaces() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("in.tiny");
        let output = temp.path().join("out.tiny");
        fs::write(&input, INTER_A).unwrap();

        tinyforge(&temp)
            .arg("reorder")
            .arg(&input)
            .arg(&output)
            .args(["--order", "intermediary,official"])
            .assert()
            .success();

        let content = fs::read_to_string(&output).unwrap();
        assert!(content.starts_with("tiny\t2\t0\tintermediary\tofficial\n"));
        assert!(content.contains("c\tnet/minecraft/class_1\ta"));
    }

    #[test]
    fn merge_joins_on_first_namespace() {
        let temp = TempDir::new().unwrap();
        let first = temp.path().join("a.tiny");
        let second = temp.path().join("b.tiny");
        let output = temp.path().join("merged.tiny");
        fs::write(&first, INTER_A).unwrap();
        fs::write(
            &second,
            "tiny\t2\t0\tofficial\thashed\nc\ta\tC_1\n",
        )
        .unwrap();

        tinyforge(&temp)
            .arg("merge")
            .arg(&first)
            .arg(&second)
            .arg("-o")
            .arg(&output)
            .assert()
            .success();

        let content = fs::read_to_string(&output).unwrap();
        assert!(content.starts_with("tiny\t2\t0\tofficial\tintermediary\thashed\n"));
    }

    #[test]
    fn merge_reports_missing_input() {
        let temp = TempDir::new().unwrap();
        tinyforge(&temp)
            .arg("merge")
            .arg(temp.path().join("a.tiny"))
            .arg(temp.path().join("b.tiny"))
            .arg("-o")
            .arg(temp.path().join("out.tiny"))
            .assert()
            .failure();
    }
}
