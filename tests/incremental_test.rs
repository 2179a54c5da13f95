mod common;

use common::{assert_success, stdout_contains, TestEnvironment};

#[test]
fn should_create_cache_on_first_build() {
    // Arrange
    let env = TestEnvironment::minimal();
    assert!(!env.cache_exists());

    // Act
    let result = env.run_build();

    // Assert
    assert_success(&result);
    assert!(env.cache_exists());
}

#[test]
fn should_skip_unchanged_posts_on_incremental_build() {
    // Arrange
    let env = TestEnvironment::minimal();
    let result = env.run_build_incremental();
    assert_success(&result);

    // Act
    let result = env.run_build_incremental();

    // Assert
    assert_success(&result);
    assert!(stdout_contains(&result, "Skipping (unchanged): test-post"));
    assert!(stdout_contains(&result, "Built: 0"));
}

#[test]
fn should_rebuild_when_post_content_changes() {
    // Arrange
    let env = TestEnvironment::minimal();
    let result = env.run_build();
    assert_success(&result);

    env.modify_post("test-post");

    // Act
    let result = env.run_build_incremental();

    // Assert
    assert_success(&result);
    assert!(stdout_contains(&result, "Building: test-post"));
    let output = env.read_output("posts/test-post/original/index.html");
    assert!(output.contains("Modified content"));
}

#[test]
fn should_rebuild_when_translation_is_added() {
    // Arrange
    let env = TestEnvironment::minimal();
    let result = env.run_build();
    assert_success(&result);

    env.write_file("posts/test-post.zh.md", "---\ntitle: \"测试\"\n---\n\n中文内容\n");

    // Act
    let result = env.run_build_incremental();

    // Assert
    assert_success(&result);
    assert!(stdout_contains(&result, "Building: test-post"));
    assert!(env.output_exists("posts/test-post/zh/index.html"));
}

#[test]
fn should_rebuild_all_when_templates_change() {
    // Arrange
    let env = TestEnvironment::minimal();
    let result = env.run_build();
    assert_success(&result);

    env.write_file(
        "templates/post.html",
        "<h1>{{ post.title }}</h1>\n<div>{{ post.content | safe }}</div>\n<!-- custom -->\n",
    );

    // Act
    let result = env.run_build_incremental();

    // Assert
    assert_success(&result);
    assert!(stdout_contains(&result, "Building: test-post"));
    assert!(env.read_output("posts/test-post/original/index.html").contains("<!-- custom -->"));
}

#[test]
fn should_rebuild_when_chart_data_changes() {
    // Arrange
    let env = TestEnvironment::rich();
    let result = env.run_build();
    assert_success(&result);

    env.write_file("posts/data/loss.csv", "step,loss\n1,3.0\n10,2.0\n");

    // Act
    let result = env.run_build_incremental();

    // Assert
    assert_success(&result);
    assert!(stdout_contains(&result, "Building: rich"));
}

#[test]
fn should_rebuild_when_output_is_missing() {
    // Arrange
    let env = TestEnvironment::minimal();
    let result = env.run_build_incremental();
    assert_success(&result);

    std::fs::remove_dir_all(env.root.join("dist")).unwrap();

    // Act
    let result = env.run_build_incremental();

    // Assert
    assert_success(&result);
    assert!(stdout_contains(&result, "Building: test-post"));
    assert!(env.output_exists("posts/test-post/index.html"));
}
