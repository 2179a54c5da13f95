mod common;

use common::fixtures::{POST_MALFORMED_YAML, POST_MISSING_TITLE};
use common::{assert_failure, assert_success, stderr_contains, TestEnvironment};

#[test]
fn should_skip_post_missing_title() {
    // Arrange
    let env = TestEnvironment::minimal();
    env.write_file("posts/missing-title.md", POST_MISSING_TITLE);

    // Act
    let result = env.run_build();

    // Assert
    assert_success(&result);
    assert!(stderr_contains(&result, "missing-title.md"));
    assert!(!env.output_exists("posts/missing-title/index.html"));
    assert!(env.output_exists("posts/test-post/index.html"));
}

#[test]
fn should_skip_post_with_malformed_yaml() {
    // Arrange
    let env = TestEnvironment::minimal();
    env.write_file("posts/broken.md", POST_MALFORMED_YAML);

    // Act
    let result = env.run_build();

    // Assert
    assert_success(&result);
    assert!(!env.output_exists("posts/broken/index.html"));
}

#[test]
fn should_error_on_invalid_config() {
    // Arrange
    let env = TestEnvironment::minimal();
    env.write_file("config.yaml", "site: [unclosed");

    // Act
    let result = env.run_build();

    // Assert
    assert_failure(&result);
    assert!(stderr_contains(&result, "config.yaml"));
}

#[test]
fn should_error_on_broken_template() {
    // Arrange
    let env = TestEnvironment::minimal();
    env.write_file("templates/post.html", "{% if %}broken");

    // Act
    let result = env.run_build();

    // Assert
    assert_failure(&result);
    assert!(stderr_contains(&result, "templates"));
}

#[test]
fn should_build_empty_site_without_posts_directory() {
    // Arrange
    let env = TestEnvironment::minimal();
    std::fs::remove_dir_all(env.root.join("posts")).unwrap();

    // Act
    let result = env.run_build();

    // Assert
    assert_success(&result);
    assert!(env.read_output("index.html").contains("No posts found."));
}

#[test]
fn should_build_with_default_config() {
    // Arrange
    let env = TestEnvironment::minimal();
    std::fs::remove_file(env.root.join("config.yaml")).unwrap();

    // Act
    let result = env.run_build();

    // Assert
    assert_success(&result);
    assert!(env.read_output("index.html").contains("<title>Portfolio</title>"));
}
