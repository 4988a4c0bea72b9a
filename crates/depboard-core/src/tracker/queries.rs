//! GraphQL documents sent to the tracker. Each carries an operation name so
//! logs and test doubles can tell them apart.

use crate::config::OwnerKind;

const PROJECT_ITEMS: &str = r#"query ProjectItems($owner: String!, $number: Int!, $pageSize: Int!, $cursor: String) {
  owner: {owner_field}(login: $owner) {
    projectV2(number: $number) {
      items(first: $pageSize, after: $cursor) {
        pageInfo { hasNextPage endCursor }
        nodes {
          id
          fieldValues(first: 30) {
            nodes {
              ... on ProjectV2ItemFieldSingleSelectValue {
                name
                field { ... on ProjectV2FieldCommon { name } }
              }
            }
          }
          content {
            __typename
            ... on Issue {
              number
              title
              url
              state
              labels(first: 10) { nodes { name color } }
              parent { number state }
              subIssues(first: 50) { nodes { number title url state } }
              blockedBy(first: 25) { nodes { number state } }
              blocking(first: 25) { nodes { number state } }
            }
          }
        }
      }
    }
  }
}"#;

pub fn project_items(owner_kind: OwnerKind) -> String {
    PROJECT_ITEMS.replace("{owner_field}", owner_kind.graphql_field())
}

const CHECK_CONTEXTS: &str = r#"statusCheckRollup {
  state
  contexts(first: 50) {
    nodes {
      __typename
      ... on CheckRun { name status conclusion detailsUrl }
      ... on StatusContext { context state targetUrl }
    }
  }
}"#;

const PULL_REQUESTS: &str = r#"query PullRequests($owner: String!, $name: String!) {
  repository(owner: $owner, name: $name) {
    pullRequests(states: OPEN, first: 50, orderBy: {field: UPDATED_AT, direction: DESC}) {
      nodes {
        number
        title
        url
        body
        headRefName
        isDraft
        mergeStateStatus
        reviewDecision
        additions
        deletions
        changedFiles
        commits(last: 1) { nodes { commit { {checks} } } }
      }
    }
  }
}"#;

pub fn pull_requests() -> String {
    PULL_REQUESTS.replace("{checks}", CHECK_CONTEXTS)
}

/// One aliased `ref` lookup per tracked branch (`b0`, `b1`, ...).
pub fn branch_snapshots(branches: &[String]) -> String {
    let mut refs = String::new();
    for (i, branch) in branches.iter().enumerate() {
        let qualified = serde_json::Value::String(format!("refs/heads/{branch}"));
        refs.push_str(&format!(
            "    b{i}: ref(qualifiedName: {qualified}) {{ ...BranchTip }}\n"
        ));
    }
    format!(
        "query BranchSnapshots($owner: String!, $name: String!) {{\n  repository(owner: $owner, name: $name) {{\n{refs}  }}\n}}\n\
         fragment BranchTip on Ref {{\n  name\n  target {{\n    ... on Commit {{\n      oid\n      messageHeadline\n      committedDate\n      {CHECK_CONTEXTS}\n    }}\n  }}\n}}"
    )
}

pub const DEPLOYMENTS: &str = r#"query Deployments($owner: String!, $name: String!) {
  repository(owner: $owner, name: $name) {
    deployments(last: 20, orderBy: {field: CREATED_AT, direction: ASC}) {
      nodes {
        environment
        state
        createdAt
        updatedAt
        commitOid
        latestStatus { environmentUrl logUrl }
      }
    }
  }
}"#;

pub const ITEM_HANDLE: &str = r#"query ItemHandle($owner: String!, $name: String!, $number: Int!) {
  repository(owner: $owner, name: $name) {
    issue(number: $number) {
      projectItems(first: 20) {
        nodes { id project { id number } }
      }
    }
  }
}"#;

pub const UPDATE_ITEM_FIELD: &str = r#"mutation UpdateItemField($project: ID!, $item: ID!, $field: ID!, $option: String!) {
  updateProjectV2ItemFieldValue(
    input: {projectId: $project, itemId: $item, fieldId: $field, value: {singleSelectOptionId: $option}}
  ) {
    projectV2Item { id }
  }
}"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_items_uses_owner_kind() {
        assert!(project_items(OwnerKind::User).contains("owner: user(login: $owner)"));
        assert!(project_items(OwnerKind::Organization).contains("owner: organization(login: $owner)"));
    }

    #[test]
    fn branch_query_aliases_each_branch_and_escapes_names() {
        let q = branch_snapshots(&["main".to_string(), "we\"ird".to_string()]);
        assert!(q.contains(r#"b0: ref(qualifiedName: "refs/heads/main")"#));
        assert!(q.contains(r#"b1: ref(qualifiedName: "refs/heads/we\"ird")"#));
        assert!(q.contains("fragment BranchTip on Ref"));
    }

    #[test]
    fn pull_requests_embeds_check_contexts() {
        let q = pull_requests();
        assert!(q.contains("statusCheckRollup"));
        assert!(!q.contains("{checks}"));
    }
}
