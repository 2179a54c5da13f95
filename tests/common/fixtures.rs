#![allow(dead_code)]

pub const MINIMAL_CONFIG: &str = r#"site:
  title:
    original: "测试站点"
    en: "Test Site"
  default_lang: original

profile:
  name: "Ada"
  tagline:
    original: "研究员"
    en: "Researcher"
  bio: "Writes about representation learning."

links:
  github: "https://github.com/ada"
  email: "ada@example.com"
"#;

pub const MINIMAL_POST: &str = r#"---
title: "Test Post"
date: 2024-01-15T10:00:00Z
tags: [test, example]
summary: "A post about testing"
---

This is a test post content.

## Heading

Some more content here.
"#;

pub const TRANSLATED_POST: &str = r#"---
title: "Test Post (English)"
date: 2024-01-15
tags: [test, example]
summary: "The English version"
---

This is the English version.
"#;

pub const RICH_POST: &str = r##"---
title: "Rich Post"
date: 2024-02-01
tags: [ml]
---

Energy $E = mc^2$ holds, and so does $$\sum_i x_i$$ on its own.

As shown in (Chen et al., "Exploring Simple Siamese Representation Learning", CVPR 2021).

```
title="Training"
src="posts/data/loss.csv" title="Loss" color="#ff6b6b"
```

```
title="Broken"
src="posts/data/missing.csv" title="Missing"
```

```diagram:simsiam
```

```diagram:jepa
```

```diagram:nonsense
```

```python
print("$not math$")
```
"##;

pub const LOSS_CSV: &str = "step,loss\n1,2.5\n10,1.2\n100,0.4\n";

pub const POST_MISSING_TITLE: &str = r#"---
date: 2024-01-15T10:00:00Z
tags: []
---

Post without title.
"#;

pub const POST_MALFORMED_YAML: &str = r#"---
title: "Broken
date: 2024-01-15
tags: [
---

Malformed YAML frontmatter.
"#;
