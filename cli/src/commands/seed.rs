//! The seed run: preflight, readiness, the fixed object sequence, imports, image
//! annotations and the final counts.
//!
//! Each step takes the typed ids returned by earlier steps, so nothing is referenced before it
//! has been created. There is no rollback: the first failing command aborts the run and leaves
//! whatever was already created on the server.

use anyhow::{Context, Result};
use log::{info, warn};
use omero_client::{
    AnnotationRef, AnnotationTarget, Client, Dataset, ImageId, Import, Link, MapAnnotation,
    NewDataset, NewMapAnnotation, NewProject, Project, Tag,
};
use structopt::StructOpt;

use crate::{
    commands::{
        count,
        import::{self, ImportRule, SEED_PATTERNS},
        preflight,
        wait::{self, ReadinessArgs},
    },
    printer::{CreatedObject, Printer},
    utils::FilePattern,
};

pub const DATASET_NAMES: [&str; 3] = ["seed-dataset-1", "seed-dataset-2", "seed-dataset-3"];
pub const PROJECT_NAME: &str = "seed-project";
pub const TAG_NAMES: [&str; 2] = ["seed-tag-primary", "seed-tag-secondary"];

pub const MAP1_NAMESPACE: &str = "openmicroscopy.org/omero/client/mapAnnotation";
pub const MAP3_NAMESPACE: &str = "seed test namespace";
pub const MAP4_NAMESPACE: &str = "http://[malformed";

/// Positions in the list of imported images that get tagged and annotated.
pub const ANNOTATED_IMAGE_INDICES: [usize; 3] = [0, 1, 2];

#[derive(Debug, StructOpt)]
pub struct SeedArgs {
    #[structopt(long = "data-dir")]
    /// Directory holding the images to import, as seen by the OMERO CLI
    data_dir: Option<String>,

    #[structopt(long = "skip-wait")]
    /// Don't wait for the server before creating objects
    skip_wait: bool,

    #[structopt(flatten)]
    readiness: ReadinessArgs,

    #[structopt(long = "link-map2-to-ds2")]
    /// Link the second map annotation to the second dataset. By default the first map
    /// annotation is linked there instead, matching the historical seed data.
    link_map2_to_ds2: bool,

    #[structopt(long = "no-progress")]
    /// Don't display a progress bar while importing
    no_progress: bool,
}

/// Everything created by the object sequence, before any import.
#[derive(Debug)]
pub struct SeedObjects {
    pub ds1: Dataset,
    pub ds2: Dataset,
    pub ds3: Dataset,
    pub tag1: Tag,
    pub tag2: Tag,
    pub map1: MapAnnotation,
    pub map2: MapAnnotation,
    pub map3: MapAnnotation,
    pub map4: MapAnnotation,
    pub project: Project,
    pub links: Vec<Link>,
}

impl SeedObjects {
    fn import_rules(&self) -> Result<Vec<ImportRule>> {
        let targets = [self.ds1.id, self.ds2.id, self.ds3.id, self.ds3.id];
        SEED_PATTERNS
            .iter()
            .zip(targets)
            .map(|(pattern, dataset)| {
                Ok(ImportRule {
                    pattern: FilePattern::new(pattern)?,
                    dataset,
                })
            })
            .collect()
    }

    fn to_created_objects(&self) -> Vec<CreatedObject> {
        let mut objects = Vec::new();
        for dataset in [&self.ds1, &self.ds2, &self.ds3] {
            objects.push(CreatedObject::new("Dataset", dataset.id.0, &dataset.name));
        }
        for tag in [&self.tag1, &self.tag2] {
            objects.push(CreatedObject::new("TagAnnotation", tag.id.0, &tag.name));
        }
        for map in [&self.map1, &self.map2, &self.map3, &self.map4] {
            objects.push(CreatedObject::new(
                "MapAnnotation",
                map.id.0,
                map.namespace.as_deref().unwrap_or(""),
            ));
        }
        objects.push(CreatedObject::new(
            "Project",
            self.project.id.0,
            &self.project.name,
        ));
        for link in &self.links {
            objects.push(CreatedObject::new(
                link.kind,
                link.id.0,
                format!("{} -> {}", link.parent, link.child),
            ));
        }
        objects
    }
}

/// Which map annotation gets linked to the second dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ds2MapLink {
    /// Link `MAP1` again, matching the historical seed data.
    Map1,
    Map2,
}

pub fn run(
    client: &Client,
    args: &SeedArgs,
    default_data_dir: &str,
    printer: &Printer,
) -> Result<()> {
    let data_dir = args.data_dir.as_deref().unwrap_or(default_data_dir);

    preflight::check(client, data_dir)?;

    if args.skip_wait {
        warn!("Not waiting for the server to become ready.");
    } else {
        wait::wait_for_server(client, &args.readiness.config())?;
    }

    let ds2_map_link = if args.link_map2_to_ds2 {
        Ds2MapLink::Map2
    } else {
        Ds2MapLink::Map1
    };
    let objects = create_objects(client, ds2_map_link)?;

    let rules = objects.import_rules()?;
    let imports = import::import_matching(client, data_dir, &rules, !args.no_progress)?;
    let image_links = annotate_images(client, &objects, &imports)?;

    let mut created = objects.to_created_objects();
    created.extend(import::imported_objects(&imports));
    created.extend(image_links.iter().map(|link| {
        CreatedObject::new(link.kind, link.id.0, format!("{} -> {}", link.parent, link.child))
    }));
    printer.print_resources(&created)?;

    let counts = count::count_created_today(client)?;
    printer.print_resources(&counts)?;

    info!(
        "Seeding finished: {} objects created, {} images imported from {} files.",
        created.len(),
        imports.iter().map(|import| import.images.len()).sum::<usize>(),
        imports.len()
    );
    Ok(())
}

/// Creates datasets, tags, map annotations and the project, then links them together.
pub fn create_objects(client: &Client, ds2_map_link: Ds2MapLink) -> Result<SeedObjects> {
    let ds1 = create_dataset(client, DATASET_NAMES[0])?;
    let ds2 = create_dataset(client, DATASET_NAMES[1])?;
    let ds3 = create_dataset(client, DATASET_NAMES[2])?;

    let tag1 = create_tag(client, TAG_NAMES[0])?;
    let tag2 = create_tag(client, TAG_NAMES[1])?;

    let map1 = create_map_annotation(
        client,
        Some(MAP1_NAMESPACE),
        &[("sample", "alpha"), ("stain", "DAPI"), ("magnification", "40x")],
    )?;
    let map2 = create_map_annotation(client, None, &[("sample", "beta"), ("operator", "seed")])?;
    let map3 = create_map_annotation(client, Some(MAP3_NAMESPACE), &[("kind", "non-uri")])?;
    let map4 = create_map_annotation(client, Some(MAP4_NAMESPACE), &[("kind", "malformed")])?;

    let project = client
        .create_project(NewProject {
            name: PROJECT_NAME,
            description: Some("Sample project created by omero-seed"),
        })
        .context("Operation to create a project has failed")?;
    info!(
        "New project `{}` [id: {}] created successfully",
        project.name, project.id
    );

    let ds2_map = match ds2_map_link {
        Ds2MapLink::Map1 => {
            warn!(
                "Linking {} to {} in place of {}; pass --link-map2-to-ds2 to link {} instead.",
                map1.id, ds2.id, map2.id, map2.id
            );
            map1.id
        }
        Ds2MapLink::Map2 => map2.id,
    };

    let mut links = Vec::new();
    for dataset in [&ds1, &ds2] {
        links.push(
            client
                .link_dataset_to_project(project.id, dataset.id)
                .with_context(|| {
                    format!(
                        "Operation to link {} to {} has failed",
                        dataset.id, project.id
                    )
                })?,
        );
    }

    let annotation_links: [(AnnotationTarget, AnnotationRef); 7] = [
        (ds1.id.into(), map1.id.into()),
        (ds1.id.into(), tag1.id.into()),
        (ds2.id.into(), ds2_map.into()),
        (ds3.id.into(), map4.id.into()),
        (ds3.id.into(), tag2.id.into()),
        (project.id.into(), map3.id.into()),
        (project.id.into(), tag2.id.into()),
    ];
    for (target, annotation) in annotation_links {
        links.push(
            client
                .link_annotation(target, annotation)
                .context("Operation to link an annotation has failed")?,
        );
    }
    for link in &links {
        info!("New link {link} created successfully");
    }

    Ok(SeedObjects {
        ds1,
        ds2,
        ds3,
        tag1,
        tag2,
        map1,
        map2,
        map3,
        map4,
        project,
        links,
    })
}

/// Links `TAG1` and `MAP2` to the images at [`ANNOTATED_IMAGE_INDICES`], in import order.
pub fn annotate_images(
    client: &Client,
    objects: &SeedObjects,
    imports: &[Import],
) -> Result<Vec<Link>> {
    let images: Vec<ImageId> = imports
        .iter()
        .flat_map(|import| import.images.iter().copied())
        .collect();

    let mut links = Vec::new();
    for index in ANNOTATED_IMAGE_INDICES {
        let Some(&image) = images.get(index) else {
            warn!(
                "Only {} image(s) were imported; not annotating image #{index}.",
                images.len()
            );
            continue;
        };
        for annotation in [
            AnnotationRef::from(objects.tag1.id),
            AnnotationRef::from(objects.map2.id),
        ] {
            let link = client
                .link_annotation(image, annotation)
                .with_context(|| format!("Operation to annotate {image} has failed"))?;
            info!("New link {link} created successfully");
            links.push(link);
        }
    }
    Ok(links)
}

fn create_dataset(client: &Client, name: &str) -> Result<Dataset> {
    let dataset = client
        .create_dataset(NewDataset {
            name,
            description: None,
        })
        .with_context(|| format!("Operation to create dataset `{name}` has failed"))?;
    info!(
        "New dataset `{}` [id: {}] created successfully",
        dataset.name, dataset.id
    );
    Ok(dataset)
}

fn create_tag(client: &Client, name: &str) -> Result<Tag> {
    let tag = client
        .create_tag(name)
        .with_context(|| format!("Operation to create tag `{name}` has failed"))?;
    info!("New tag `{}` [id: {}] created successfully", tag.name, tag.id);
    Ok(tag)
}

fn create_map_annotation(
    client: &Client,
    namespace: Option<&str>,
    pairs: &[(&str, &str)],
) -> Result<MapAnnotation> {
    let annotation = client
        .create_map_annotation(NewMapAnnotation { namespace, pairs })
        .context("Operation to create a map annotation has failed")?;
    info!(
        "New map annotation [id: {}, namespace: {:?}] created successfully",
        annotation.id, annotation.namespace
    );
    Ok(annotation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{commands::testing::FakeServer, printer::OutputFormat};
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    fn seed_args(extra: &[&str]) -> SeedArgs {
        SeedArgs::from_iter(
            ["seed", "--retry-interval", "0", "--no-progress"]
                .iter()
                .chain(extra),
        )
    }

    fn server_with_images() -> FakeServer {
        FakeServer::new()
            .with_file("/data/well_14-A02.png")
            .with_file("/data/well_14-A01.png")
            .with_file("/data/well_15-B01.png")
            .with_file("/data/well_16-C01.png")
            .with_file("/data/stack.ome.tif")
            .with_file("/data/readme.txt")
    }

    fn run_seed(server: &FakeServer, extra: &[&str]) -> Result<()> {
        run(
            &server.client(),
            &seed_args(extra),
            "/data",
            &Printer::new(OutputFormat::Json),
        )
    }

    /// Arguments of an `omero` command that reference existing objects.
    fn references(command: &[String]) -> Vec<String> {
        let mut references: Vec<String> = command
            .iter()
            .filter_map(|arg| {
                arg.strip_prefix("parent=")
                    .or_else(|| arg.strip_prefix("child="))
                    .map(str::to_owned)
            })
            .collect();
        match command.first().map(String::as_str) {
            Some("import") => references.push(command[2].clone()),
            Some("obj") if command[1] == "map-set" => references.push(command[2].clone()),
            _ => {}
        }
        references
    }

    #[test]
    fn test_full_run_creates_expected_objects() {
        let server = server_with_images();
        run_seed(&server, &[]).unwrap();

        assert_eq!(server.created_of_kind("Dataset"), 3);
        assert_eq!(server.created_of_kind("Project"), 1);
        assert_eq!(server.created_of_kind("TagAnnotation"), 2);
        assert_eq!(server.created_of_kind("MapAnnotation"), 4);
        assert_eq!(server.created_of_kind("Image"), 5);
        assert_eq!(server.created_of_kind("ProjectDatasetLink"), 2);
        assert_eq!(server.created_of_kind("DatasetAnnotationLink"), 5);
        assert_eq!(server.created_of_kind("ProjectAnnotationLink"), 2);
        assert_eq!(server.created_of_kind("ImageAnnotationLink"), 6);
    }

    #[test]
    fn test_no_forward_references() {
        let server = server_with_images();
        run_seed(&server, &[]).unwrap();

        let mut created = server.created().into_iter();
        let mut known = HashSet::new();
        for command in server.omero_commands() {
            for reference in references(&command) {
                assert!(
                    known.contains(&reference),
                    "{reference} used before creation in {command:?}"
                );
            }
            let creates = matches!(command[0].as_str(), "import")
                || (command[0] == "obj" && command[1] == "new");
            if creates {
                let (kind, id) = created.next().unwrap();
                known.insert(format!("{kind}:{id}"));
            }
        }
    }

    #[test]
    fn test_imports_follow_pattern_order_and_targets() {
        let server = server_with_images();
        run_seed(&server, &[]).unwrap();

        let imports: Vec<(String, String)> = server
            .omero_commands()
            .into_iter()
            .filter(|command| command[0] == "import")
            .map(|command| (command[2].clone(), command[3].clone()))
            .collect();
        let dataset = |index: usize| {
            let (_, id) = server
                .created()
                .into_iter()
                .filter(|(kind, _)| kind == "Dataset")
                .nth(index)
                .unwrap();
            format!("Dataset:{id}")
        };
        assert_eq!(
            imports,
            vec![
                (dataset(0), "/data/well_14-A01.png".to_owned()),
                (dataset(0), "/data/well_14-A02.png".to_owned()),
                (dataset(1), "/data/well_15-B01.png".to_owned()),
                (dataset(2), "/data/well_16-C01.png".to_owned()),
                (dataset(2), "/data/stack.ome.tif".to_owned()),
            ]
        );
    }

    fn ds2_map_link_child(server: &FakeServer) -> String {
        let ds2 = server
            .created()
            .into_iter()
            .filter(|(kind, _)| kind == "Dataset")
            .nth(1)
            .unwrap()
            .1;
        let parent = format!("parent=Dataset:{ds2}");
        server
            .omero_commands()
            .into_iter()
            .find(|command| {
                command.contains(&parent)
                    && command.iter().any(|arg| arg.starts_with("child=MapAnnotation:"))
            })
            .and_then(|command| command.last().cloned())
            .unwrap()
    }

    fn map_annotation(server: &FakeServer, index: usize) -> String {
        let (_, id) = server
            .created()
            .into_iter()
            .filter(|(kind, _)| kind == "MapAnnotation")
            .nth(index)
            .unwrap();
        format!("child=MapAnnotation:{id}")
    }

    #[test]
    fn test_second_dataset_gets_first_map_by_default() {
        let server = server_with_images();
        run_seed(&server, &[]).unwrap();
        assert_eq!(ds2_map_link_child(&server), map_annotation(&server, 0));
    }

    #[test]
    fn test_second_dataset_gets_second_map_when_asked() {
        let server = server_with_images();
        run_seed(&server, &["--link-map2-to-ds2"]).unwrap();
        assert_eq!(ds2_map_link_child(&server), map_annotation(&server, 1));
    }

    #[test]
    fn test_missing_cli_stops_before_server_interaction() {
        let server = server_with_images().without_cli();
        let error = run_seed(&server, &[]).unwrap_err();

        assert!(format!("{error:#}").contains("not executable"), "{error:#}");
        assert!(server.omero_commands().is_empty());
        assert_eq!(server.commands().len(), 1);
    }

    #[test]
    fn test_missing_data_dir_stops_before_import() {
        let server = server_with_images().without_data_dir();
        let error = run_seed(&server, &[]).unwrap_err();

        assert!(format!("{error:#}").contains("/data"), "{error:#}");
        assert!(server.omero_commands().is_empty());
        assert_eq!(server.count_commands("import"), 0);
    }

    #[test]
    fn test_waits_for_server_before_creating() {
        let server = server_with_images().ready_after(3);
        run_seed(&server, &[]).unwrap();

        let commands = server.omero_commands();
        let first_create = commands
            .iter()
            .position(|command| command[0] == "obj")
            .unwrap();
        assert_eq!(first_create, 4);
        assert!(commands[..4].iter().all(|command| command[0] == "hql"));
    }

    #[test]
    fn test_unready_server_fails_after_final_attempt() {
        let server = server_with_images().ready_after(100);
        let error = run_seed(&server, &["--max-retries", "4"]).unwrap_err();

        assert!(format!("{error:#}").contains("not ready after 5 attempts"), "{error:#}");
        assert_eq!(server.count_commands("hql"), 5);
        assert_eq!(server.created(), vec![]);
    }

    #[test]
    fn test_failure_mid_sequence_aborts_without_rollback() {
        let server = server_with_images().failing_on("import");
        run_seed(&server, &["--skip-wait"]).unwrap_err();

        assert_eq!(server.count_commands("import"), 1);
        assert_eq!(server.created_of_kind("Dataset"), 3);
        assert_eq!(server.created_of_kind("ImageAnnotationLink"), 0);
    }

    #[test]
    fn test_counts_after_full_run_match_created_objects() {
        let server = server_with_images();
        run_seed(&server, &[]).unwrap();

        let counts: Vec<(String, u64)> = count::count_created_today(&server.client())
            .unwrap()
            .into_iter()
            .map(|count| (count.kind, count.count))
            .collect();
        assert_eq!(
            counts,
            vec![
                ("Project".to_owned(), 1),
                ("Dataset".to_owned(), 3),
                ("Image".to_owned(), 5),
            ]
        );
    }

    #[test]
    fn test_few_images_skips_missing_indices() {
        let server = FakeServer::new().with_file("/data/only_15-1.png");
        run_seed(&server, &["--skip-wait"]).unwrap();

        assert_eq!(server.created_of_kind("Image"), 1);
        assert_eq!(server.created_of_kind("ImageAnnotationLink"), 2);
    }
}
