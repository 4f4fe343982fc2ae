pub const INTRO_QUESTION: &str = "안녕하세요, 면접 시작하겠습니다. 간단하게 자기소개 부탁드릴게요.";
pub const CLOSING_QUESTION: &str = "네, 수고하셨습니다. 면접 마무리하기 전에, 오늘 면접에서 꼭 전달하고 싶었던 내용이 있다면 마지막으로 말씀해 주세요.";

pub const DRAFT_TEMPLATE: &str = "\
당신은 뛰어난 AI 면접관입니다. 아래 이력서를 기반으로 면접 질문을 생성해주세요.

[이력서 내용]
{resume}

[질문 작성 규칙]
- 이력서에 언급된 기술, 경험, 프로젝트, 직무 관련 내용에서만 질문을 추출하세요.
- 자기소개에 대한 내용은 절대로 언급하지 마세요.
- 질문은 총 3개이며, 모두 동일한 난이도 기준으로 작성하세요. (난이도: {difficulty})
- 난이도는 참고용입니다. 출력에 절대 포함하지 마세요.
- 질문 앞에 '중간 난이도 질문:', 'Q1.', '숫자', '-', '*' 등 어떤 형식이든 절대로 붙이지 마세요.
- 절대로 안내 문구, 제목, 카테고리 구분 같은 텍스트는 출력하지 마세요.
- 각 질문은 완전한 자연어 문장으로 구성하세요
- 기술 역량, 협업/갈등 해결, 문제 해결 방식 등을 중심으로 구성하세요.
- 질문 내용만 줄바꿈으로 구분해 출력하세요.

[난이도 지침(출력 금지, 참고만 할 것)]
- {guidance}
- 질문 난이도는 위 난이도 지침을 참고하세요. 쉬움,중간,어려움의 질문 차이가 명확해야합니다.

{output_rules}

[예시 출력 형식]
React 프로젝트에서 성능 최적화를 위해 어떤 방법을 사용하셨나요?
협업 중 의견 충돌이 있었을 때 어떻게 해결하셨나요?
본인의 기술 역량 중 가장 자신 있는 부분은 무엇인가요?

위 정보를 기반으로 면접관이 물어볼 수 있는 질문 3개를 리스트로 출력하세요.";

pub const REVIEW_TEMPLATE: &str = "\
당신은 뛰어난 AI 면접 관리자입니다. 아래 이력서를 기반으로 생성된 질문을 검토하고, 정확히 **3개의 질문만** 출력해야 합니다.

[이력서 내용]
{resume}

[생성된 질문]
{draft}

[난이도 지침(출력 금지, 참고만 할 것)]
- {guidance}
- 질문 난이도는 위 난이도 지침을 참고하세요.

[검토 지침]
- 오직 이력서에 실제로 언급된 기술, 경험, 프로젝트에 관련된 질문만 남겨야 합니다.
- 관련 없는 질문은 제거하거나, **이력서의 관련 내용을 기반으로 수정**해 주세요.
- 질문의 난이도에 맞는지 검토하고, **어려움**일 경우에는 특정 기술에 대해 전문적인 지식을 요구하는 수준의 질문으로 수정해주세요.
- **질문은 정확히 3개만** 출력합니다.

{output_rules}

[나쁜 예시] — 이런 출력은 실패입니다.
1. 홍길동, 본인이 참여한 프로젝트는 무엇인가요?
- Python 프로젝트 경험에 대해 말씀해 주세요.
Q3. 전자회사에서 어떤 기술을 썼나요?";
